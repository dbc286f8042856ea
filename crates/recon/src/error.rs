use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors. Anything returned here aborts the run; row-level problems
/// are reported as [`crate::model::RowIssue`] instead.
#[derive(Debug, Error)]
pub enum ReconError {
    /// Input or output file could not be opened, read or written.
    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Malformed delimited text.
    #[error("{source_name}: malformed CSV: {message}")]
    Csv { source_name: String, message: String },
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (empty column name, bad date format, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// No record carried the header marker.
    #[error("{source_name}: no header row containing '{marker}'")]
    HeaderNotFound { source_name: String, marker: String },
    /// A configured column does not exist in the source header.
    #[error("{source_name}: missing column '{column}'")]
    MissingColumn { source_name: String, column: String },
}

impl ReconError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}
