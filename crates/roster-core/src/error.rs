//! Error types for roster-core

use thiserror::Error;

/// Result type alias using roster-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in roster-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed record, decision or argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV decoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The store cannot be reached at all; aborts a whole sync batch
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

const UNAVAILABLE_MARKERS: &[&str] = &[
    "unable to open database",
    "disk i/o error",
    "database is locked",
    "file is not a database",
];

impl Error {
    /// Whether this error must abort the whole batch instead of a single item.
    ///
    /// Besides `StoreUnavailable`, libSQL failures that mean the database file
    /// itself cannot be used are fatal.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::StoreUnavailable(_) => true,
            Self::LibSql(error) => {
                let message = error.to_string().to_ascii_lowercase();
                UNAVAILABLE_MARKERS
                    .iter()
                    .any(|marker| message.contains(marker))
            }
            _ => false,
        }
    }
}
