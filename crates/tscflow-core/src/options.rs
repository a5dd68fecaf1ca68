//! Compile options.
//!
//! Field names in JSON use the camelCase spelling the options have always had
//! in build scripts (`outDir`, `sourceRoot`, `emitError`, ...).
//!
//! ```json
//! {
//!   "outDir": "build",
//!   "sourcemap": true,
//!   "pathFilter": { "proj-a": "a/build" },
//!   "emitError": false
//! }
//! ```

use crate::compiler::CompatFlags;
use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Default options file name looked up by the CLI.
pub const OPTIONS_FILE: &str = "tscflow.json";

/// Where to look for the `tsc` binary when no explicit path is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TscSearch {
    /// `node_modules/.bin` in the working directory and its ancestors.
    Cwd,
    /// The `PATH` of the current process.
    Shell,
}

impl TscSearch {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cwd => "cwd",
            Self::Shell => "shell",
        }
    }
}

/// Options for one compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    /// Concatenate all units into a single output with this name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out: Option<String>,
    /// Output root, relative to the working directory. `None` means in place.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_dir: Option<PathBuf>,
    /// Emit `.map` files.
    pub sourcemap: bool,
    /// Fixed `sourceRoot` written into emitted maps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_root: Option<String>,
    /// Passed through as `--mapRoot`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_root: Option<String>,
    /// Emit `.d.ts` files.
    pub declaration: bool,
    /// Ordered prefix substitutions applied to output paths.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub path_filter: IndexMap<String, String>,
    /// Fail the request on compilation errors. When `false`, failures only
    /// produce diagnostics.
    pub emit_error: bool,
    /// Treat warnings as output-suppressing for the affected unit.
    pub safe: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    pub no_implicit_any: bool,
    pub remove_comments: bool,
    pub no_lib: bool,
    /// Extra arguments appended verbatim to the compiler command line.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub additional_tsc_parameters: Vec<String>,
    /// Explicit compiler binary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tsc_path: Option<PathBuf>,
    /// Search order used when `tsc_path` is unset.
    pub tsc_search: Vec<TscSearch>,
    /// Parent directory for temporary workspaces. Defaults to the working directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmp_dir: Option<PathBuf>,
    /// Override the detected "compiler emits despite errors" behavior.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emit_on_error: Option<bool>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            out: None,
            out_dir: None,
            sourcemap: false,
            source_root: None,
            map_root: None,
            declaration: false,
            path_filter: IndexMap::new(),
            emit_error: true,
            safe: false,
            target: None,
            module: None,
            no_implicit_any: false,
            remove_comments: false,
            no_lib: false,
            additional_tsc_parameters: Vec::new(),
            tsc_path: None,
            tsc_search: vec![TscSearch::Cwd, TscSearch::Shell],
            tmp_dir: None,
            emit_on_error: None,
        }
    }
}

impl CompileOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let options: Self = serde_json::from_str(&text).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        options.validate()?;
        Ok(options)
    }

    /// Reject option combinations that cannot produce a sensible layout.
    pub fn validate(&self) -> Result<()> {
        if let Some(out) = &self.out {
            let path = Path::new(out);
            if out.trim().is_empty() {
                return Err(Error::Configuration("`out` must not be empty".into()));
            }
            if path.is_absolute() || path.has_root() {
                return Err(Error::Configuration(format!(
                    "`out` must be relative to the output root, got '{out}'"
                )));
            }
            if path.components().any(|c| matches!(c, Component::ParentDir)) {
                return Err(Error::Configuration(format!(
                    "`out` must not leave the output root, got '{out}'"
                )));
            }
        }

        if self.path_filter.keys().any(|k| k.trim_matches('/').is_empty()) {
            return Err(Error::Configuration(
                "`pathFilter` prefixes must not be empty".into(),
            ));
        }

        if self.source_root.is_some() && !self.sourcemap {
            tracing::warn!("`sourceRoot` has no effect without `sourcemap`");
        }

        Ok(())
    }

    /// Compiler behavior flags after applying overrides.
    #[must_use]
    pub fn effective_compat(&self, detected: CompatFlags) -> CompatFlags {
        CompatFlags {
            emit_on_error: self.emit_on_error.unwrap_or(detected.emit_on_error),
            ..detected
        }
    }

    #[must_use]
    pub fn is_bundle(&self) -> bool {
        self.out.is_some()
    }

    #[must_use]
    pub fn with_out(mut self, out: impl Into<String>) -> Self {
        self.out = Some(out.into());
        self
    }

    #[must_use]
    pub fn with_out_dir(mut self, out_dir: impl Into<PathBuf>) -> Self {
        self.out_dir = Some(out_dir.into());
        self
    }

    #[must_use]
    pub fn with_sourcemap(mut self, sourcemap: bool) -> Self {
        self.sourcemap = sourcemap;
        self
    }

    #[must_use]
    pub fn with_source_root(mut self, root: impl Into<String>) -> Self {
        self.source_root = Some(root.into());
        self
    }

    #[must_use]
    pub fn with_declaration(mut self, declaration: bool) -> Self {
        self.declaration = declaration;
        self
    }

    #[must_use]
    pub fn with_path_filter(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.path_filter.insert(from.into(), to.into());
        self
    }

    #[must_use]
    pub fn with_emit_error(mut self, emit_error: bool) -> Self {
        self.emit_error = emit_error;
        self
    }

    #[must_use]
    pub fn with_safe(mut self, safe: bool) -> Self {
        self.safe = safe;
        self
    }

    #[must_use]
    pub fn with_tmp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tmp_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_tsc_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.tsc_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_emit_on_error(mut self, emit: bool) -> Self {
        self.emit_on_error = Some(emit);
        self
    }
}
