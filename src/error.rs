//! Error types for gtimeline.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while converting a location history export.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("Failed to read input: {0}")]
    InputRead(#[source] std::io::Error),

    #[error("Invalid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Failed to write output: {0}")]
    OutputWrite(#[from] csv::Error),

    #[error("{0} mode is not implemented")]
    NotImplemented(&'static str),
}

impl From<serde_json::Error> for HistoryError {
    fn from(err: serde_json::Error) -> Self {
        use serde_json::error::Category;

        match err.classify() {
            Category::Data => HistoryError::Schema(err.to_string()),
            Category::Io => HistoryError::InputRead(err.into()),
            Category::Syntax | Category::Eof => HistoryError::InvalidJson(err),
        }
    }
}
