//! Error types for reportcsvlib

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading reports or configuring an export.
///
/// Rendering itself never fails: malformed values are skipped and upstream
/// failures are rendered as an `Error:` line.
#[derive(Error, Debug)]
pub enum ReportCsvError {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Path does not exist
    #[error("path does not exist: {0}")]
    PathNotFound(PathBuf),

    /// A report, options or dictionary document is not valid JSON for its shape
    #[error("invalid JSON in '{path}': {source}")]
    InvalidJson {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Valid JSON that is not a table, a collection or an upstream failure
    #[error(
        "'{path}' is not a report (expected `rows`, `key_name` with `entries`, or `error`): {source}"
    )]
    NotAReport {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Rejected export option
    #[error("invalid option: {0}")]
    InvalidOption(String),
}
