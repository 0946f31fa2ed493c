//! Error types for the manifest.

use thiserror::Error;

/// Errors that can occur while writing or reading a manifest.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The manifest has no column with this name.
    #[error("Manifest has no '{0}' column")]
    MissingColumn(String),
}
