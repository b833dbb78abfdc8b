//! Common error types for TuringEyes

use thiserror::Error;

/// Common result type for TuringEyes operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors shared by the survey service and its command-line tooling
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file or settings value could not be used
    #[error("Configuration error: {0}")]
    Config(String),

    /// Image catalog file is not valid JSON for the expected shape
    #[error("Catalog parse error: {0}")]
    CatalogParse(#[from] serde_json::Error),

    /// Value rejected by a domain check (source type, choice, country code)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
