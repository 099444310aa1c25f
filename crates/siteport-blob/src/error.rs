//! Error types for the artifact store

use siteport_import_types::ImportError;
use thiserror::Error;

/// Errors that can occur in the artifact store
#[derive(Error, Debug)]
pub enum BlobError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Entry not found: {0}")]
    NotFound(String),

    #[error("Entry already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Version mismatch for {name}: requested {requested}, stored {stored}")]
    VersionMismatch {
        name: String,
        requested: String,
        stored: String,
    },

    #[error("Metadata error: {0}")]
    Metadata(#[from] serde_json::Error),
}

impl From<BlobError> for ImportError {
    fn from(error: BlobError) -> Self {
        match error {
            BlobError::NotFound(name) => ImportError::NotFound(name),
            BlobError::AlreadyExists(name) => ImportError::DuplicateEntry(name),
            BlobError::Io(e) => ImportError::Io(e),
            other => ImportError::Storage(other.to_string()),
        }
    }
}
