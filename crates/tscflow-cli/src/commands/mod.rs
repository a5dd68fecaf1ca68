//! CLI command implementations.

pub mod compile;
pub mod version;

use serde::Serialize;
use tscflow_core::{CompilerError, Error};

/// Error shape shared by the JSON documents.
#[derive(Debug, Serialize)]
pub struct ErrorJson {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl From<&Error> for ErrorJson {
    fn from(err: &Error) -> Self {
        match err {
            Error::Compiler(inner) => Self::from(inner),
            other => Self {
                code: other.code().to_string(),
                message: other.to_string(),
                detail: None,
            },
        }
    }
}

impl From<&CompilerError> for ErrorJson {
    fn from(err: &CompilerError) -> Self {
        Self {
            code: err.code.to_string(),
            message: err.message.clone(),
            detail: err.detail.clone(),
        }
    }
}

/// Print a JSON document on stdout.
pub fn print_json<T: Serialize>(value: &T) -> miette::Result<()> {
    let text = serde_json::to_string(value)
        .map_err(|e| miette::miette!("failed to serialize output: {e}"))?;
    println!("{text}");
    Ok(())
}
