use crate::error::Result;
use crate::options::{CompileOptions, OPTIONS_FILE};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Runtime configuration for the tscflow CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Current working directory.
    pub cwd: PathBuf,

    /// Whether to emit JSON logs.
    pub json_logs: bool,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
    pub verbosity: u8,

    /// Explicit options file. When unset, `tscflow.json` in `cwd` is used if present.
    pub options_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            json_logs: false,
            verbosity: 0,
            options_file: None,
        }
    }
}

impl Config {
    /// Create a new config with the given working directory.
    #[must_use]
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd,
            ..Default::default()
        }
    }

    /// Set verbosity level.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set JSON log output.
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }

    #[must_use]
    pub fn with_options_file(mut self, path: Option<PathBuf>) -> Self {
        self.options_file = path;
        self
    }

    /// Load compile options: the explicit file, else `tscflow.json` in the
    /// working directory, else defaults.
    pub fn load_options(&self) -> Result<CompileOptions> {
        if let Some(path) = &self.options_file {
            return CompileOptions::load(&self.cwd.join(path));
        }
        let implicit = self.cwd.join(OPTIONS_FILE);
        if implicit.is_file() {
            tracing::debug!(path = %implicit.display(), "loading options file");
            return CompileOptions::load(&implicit);
        }
        Ok(CompileOptions::default())
    }
}
