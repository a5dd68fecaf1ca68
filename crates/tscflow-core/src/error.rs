use crate::codes;
use crate::compiler::{CompilerError, Diagnostic};
use std::path::PathBuf;
use thiserror::Error;

/// Core error type for tscflow operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Compilation failed with {} error(s)", count_errors(.diagnostics))]
    Compilation { diagnostics: Vec<Diagnostic> },

    #[error("Cannot resolve '{specifier}' referenced from {}", from.display())]
    Resolution { specifier: String, from: PathBuf },

    #[error("Invalid options: {0}")]
    Configuration(String),

    #[error(transparent)]
    Compiler(#[from] CompilerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid source map {path}: {source}")]
    SourceMap {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

fn count_errors(diagnostics: &[Diagnostic]) -> usize {
    diagnostics.iter().filter(|d| d.is_error()).count()
}

impl Error {
    /// Stable code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Compilation { .. } => codes::COMPILE_FAILED,
            Self::Resolution { .. } => codes::RESOLUTION_FAILED,
            Self::Configuration(_) => codes::CONFIG_INVALID,
            Self::Compiler(err) => err.code,
            Self::Io(_) => codes::IO_ERROR,
            Self::ConfigRead { .. } => codes::CONFIG_READ_FAILED,
            Self::ConfigParse { .. } => codes::CONFIG_PARSE_FAILED,
            Self::SourceMap { .. } => codes::SOURCE_MAP_INVALID,
        }
    }

    /// Diagnostics carried by a failed compilation.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Self::Compilation { diagnostics } => diagnostics,
            _ => &[],
        }
    }
}
