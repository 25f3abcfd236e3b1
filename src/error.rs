//! Error types for the fizzy library.

use std::path::Path;
use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum FizzyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error on '{path}': {source}")]
    FileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Malformed input in '{file}': {reason}")]
    MalformedInput { file: String, reason: String },

    #[error("Schema violation in '{file}': {detail}")]
    SchemaViolation { file: String, detail: String },

    #[error("Sample '{sample}': {reason}")]
    ReferentialMismatch { sample: String, reason: String },

    #[error("Unknown selection method '{name}' (expected one of: {valid})")]
    InvalidSelectionMethod { name: String, valid: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Numerical error: {0}")]
    Numerical(String),

    #[error("Selection engine failed: {0}")]
    Engine(String),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FizzyError {
    /// Attach a file path to an I/O error, for use with `map_err`.
    pub fn io_at(path: impl AsRef<Path>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.as_ref().display().to_string();
        move |source| Self::FileIo { path, source }
    }

    pub(crate) fn schema(file: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::SchemaViolation {
            file: file.into(),
            detail: detail.into(),
        }
    }

    pub(crate) fn malformed(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            file: file.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn mismatch(sample: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ReferentialMismatch {
            sample: sample.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, FizzyError>;
