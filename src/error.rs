//! Error taxonomy for the minifier.
//!
//! Validation failures are not errors: they surface as
//! [`OptimizationOutcome::Rejected`](crate::orchestrator::OptimizationOutcome).

use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Input did not conform to the configured dialect.
#[derive(Debug, Clone, Error, Serialize)]
#[serde(rename_all = "camelCase")]
#[error("Parse error in {file}: {}", messages.join("; "))]
pub struct ParseError {
    pub file: String,
    pub messages: Vec<String>,
}

#[derive(Debug, Error)]
pub enum MinifyError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid strategy profile: {0}")]
    Profile(String),

    #[error("Manifest serialization error: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("Manifest is not invertible: key `{key}` maps to both `{first}` and `{second}`")]
    NonInvertible {
        key: String,
        first: String,
        second: String,
    },

    #[error("No optimizable modules found under {}", .0.display())]
    NoModules(PathBuf),
}

impl MinifyError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        MinifyError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Process exit status for this failure. Validation failures use 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            MinifyError::Parse(_) => 2,
            _ => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, MinifyError>;
