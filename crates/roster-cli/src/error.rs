use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] roster_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Failed to read {path}: {message}")]
    InvalidFile { path: String, message: String },
    #[error("Department not found: {0}")]
    DepartmentNotFound(String),
    #[error("Nothing to sync: no decisions selected")]
    NothingToSync,
    #[error("Configuration error: {0}")]
    Config(String),
}
