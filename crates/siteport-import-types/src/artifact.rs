//! Temporary artifact store trait
//!
//! Scratch storage keyed by (destination, folder). The import workflow stages the
//! uploaded bundle here for the duration of one attempt.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio::io::AsyncRead;

use crate::destination::DestinationId;
use crate::error::ImportResult;

/// Owned, readable byte stream handed between collaborators
pub type ByteStream = Pin<Box<dyn AsyncRead + Send + Sync>>;

/// Reference to an entry created in the temporary artifact store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactHandle {
    /// Store-assigned entry identifier
    pub entry_id: String,
    pub destination_id: DestinationId,
    pub folder_name: String,
    /// Entry name within the folder, also used as the job title
    pub title: String,
    /// Version of the persisted content
    pub version: String,
    pub content_type: String,
    pub size_bytes: u64,
}

#[async_trait]
pub trait TempArtifactStore: Send + Sync {
    /// Persist `stream` as a new entry named `filename`
    async fn create_temp_entry(
        &self,
        destination_id: DestinationId,
        folder_name: &str,
        filename: &str,
        stream: ByteStream,
        content_type: &str,
    ) -> ImportResult<ArtifactHandle>;

    /// Names of all entries in the folder
    async fn list_temp_entry_names(
        &self,
        destination_id: DestinationId,
        folder_name: &str,
    ) -> ImportResult<Vec<String>>;

    /// Delete an entry by name
    async fn delete_temp_entry(
        &self,
        destination_id: DestinationId,
        name: &str,
        folder_name: &str,
    ) -> ImportResult<()>;

    /// Open the persisted copy of an entry
    async fn open_temp_entry_stream(
        &self,
        handle: &ArtifactHandle,
        version: &str,
    ) -> ImportResult<ByteStream>;
}
