//! Compiler version detection and the behavior flags derived from it.

use regex_lite::Regex;
use semver::{Prerelease, Version};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// A detected compiler version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerVersion {
    /// The banner exactly as the compiler printed it (trimmed).
    pub raw: String,
    /// Parsed semantic version.
    pub version: Version,
}

/// Behavior differences between compiler releases that the adapter has to
/// account for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompatFlags {
    /// The compiler still writes output for files with errors (1.5+).
    pub emit_on_error: bool,
    /// `--rootDir` is understood (1.5+).
    pub root_dir: bool,
    /// Bundling uses `--outFile` rather than the older `--out` (1.6+).
    pub out_file: bool,
}

fn version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Version\s+(\d+)\.(\d+)(?:\.(\d+))?(?:-([0-9A-Za-z.-]+))?")
            .expect("valid version regex")
    })
}

impl CompilerVersion {
    /// Parse the output of `tsc --version`.
    ///
    /// Accepts both `Version 1.5.3` and the older `message TS6029: Version 1.4.1`.
    /// A missing patch component is read as zero.
    #[must_use]
    pub fn parse(output: &str) -> Option<Self> {
        let caps = version_regex().captures(output)?;
        let major = caps[1].parse().ok()?;
        let minor = caps[2].parse().ok()?;
        let patch = caps.get(3).map_or(Some(0), |m| m.as_str().parse().ok())?;

        let mut version = Version::new(major, minor, patch);
        if let Some(pre) = caps.get(4) {
            version.pre = Prerelease::new(pre.as_str()).ok()?;
        }

        Some(Self {
            raw: output.trim().to_string(),
            version,
        })
    }

    /// Build a version directly, mostly for tests and fakes.
    #[must_use]
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            raw: format!("Version {major}.{minor}.{patch}"),
            version: Version::new(major, minor, patch),
        }
    }

    /// Whether this release is `major.minor` or newer. Pre-releases of a
    /// line count as that line.
    #[must_use]
    pub fn is_at_least(&self, major: u64, minor: u64) -> bool {
        (self.version.major, self.version.minor) >= (major, minor)
    }

    /// Behavior flags for this release.
    #[must_use]
    pub fn compat(&self) -> CompatFlags {
        CompatFlags {
            emit_on_error: self.is_at_least(1, 5),
            root_dir: self.is_at_least(1, 5),
            out_file: self.is_at_least(1, 6),
        }
    }
}

impl fmt::Display for CompilerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.version)
    }
}
