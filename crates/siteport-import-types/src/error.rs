//! Error types for the import system

use thiserror::Error;

/// Result type for collaborator operations
pub type ImportResult<T> = Result<T, ImportError>;

/// Errors raised by the artifact store, the destination directory or the import engine
#[derive(Error, Debug)]
pub enum ImportError {
    /// Requested entry or record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// An entry with the same name already exists in the folder
    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    /// Temporary artifact store failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Destination directory or lifecycle service failure
    #[error("Directory error: {0}")]
    Directory(String),

    /// Import engine refused or failed to accept the job
    #[error("Import engine error: {0}")]
    Engine(String),

    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
