//! Filesystem-backed temporary artifact store
//!
//! Entries live at `<root>/<destination_id>/<folder>/<name>`. Each entry has a JSON
//! sidecar under `<folder>/.meta/` recording its id, version and content type.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use siteport_import_types::{
    ArtifactHandle, ByteStream, DestinationId, ImportResult, TempArtifactStore,
};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::BlobError;

const META_DIR_NAME: &str = ".meta";
const INITIAL_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EntryMetadata {
    entry_id: String,
    version: String,
    content_type: String,
    size_bytes: u64,
    created_at: DateTime<Utc>,
}

/// Temporary artifact store rooted at a local directory
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn folder_dir(
        &self,
        destination_id: DestinationId,
        folder_name: &str,
    ) -> Result<PathBuf, BlobError> {
        validate_component(folder_name)?;
        Ok(self
            .root
            .join(destination_id.to_string())
            .join(folder_name))
    }

    fn entry_paths(
        &self,
        destination_id: DestinationId,
        folder_name: &str,
        name: &str,
    ) -> Result<(PathBuf, PathBuf), BlobError> {
        validate_component(name)?;
        let dir = self.folder_dir(destination_id, folder_name)?;
        let data = dir.join(name);
        let meta = dir.join(META_DIR_NAME).join(format!("{}.json", name));
        Ok((data, meta))
    }

    async fn create(
        &self,
        destination_id: DestinationId,
        folder_name: &str,
        filename: &str,
        mut stream: ByteStream,
        content_type: &str,
    ) -> Result<ArtifactHandle, BlobError> {
        let (data_path, meta_path) = self.entry_paths(destination_id, folder_name, filename)?;
        if let Some(meta_dir) = meta_path.parent() {
            fs::create_dir_all(meta_dir).await?;
        }

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&data_path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(BlobError::AlreadyExists(filename.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let written = match copy_to_file(&mut stream, &mut file).await {
            Ok(written) => written,
            Err(e) => {
                drop(file);
                remove_quietly(&data_path).await;
                return Err(e.into());
            }
        };

        let metadata = EntryMetadata {
            entry_id: Uuid::new_v4().to_string(),
            version: INITIAL_VERSION.to_string(),
            content_type: content_type.to_string(),
            size_bytes: written,
            created_at: Utc::now(),
        };
        if let Err(e) = write_metadata(&meta_path, &metadata).await {
            remove_quietly(&data_path).await;
            return Err(e);
        }

        debug!(
            "CREATE {} ({} bytes, {})",
            data_path.display(),
            written,
            content_type
        );

        Ok(ArtifactHandle {
            entry_id: metadata.entry_id,
            destination_id,
            folder_name: folder_name.to_string(),
            title: filename.to_string(),
            version: metadata.version,
            content_type: metadata.content_type,
            size_bytes: written,
        })
    }

    async fn list(
        &self,
        destination_id: DestinationId,
        folder_name: &str,
    ) -> Result<Vec<String>, BlobError> {
        let dir = self.folder_dir(destination_id, folder_name)?;
        debug!("LIST {}", dir.display());

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    async fn delete(
        &self,
        destination_id: DestinationId,
        name: &str,
        folder_name: &str,
    ) -> Result<(), BlobError> {
        let (data_path, meta_path) = self.entry_paths(destination_id, folder_name, name)?;
        debug!("DELETE {}", data_path.display());

        match fs::remove_file(&data_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(BlobError::NotFound(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        if let Err(e) = fs::remove_file(&meta_path).await {
            if e.kind() != ErrorKind::NotFound {
                warn!("Failed to remove metadata {}: {}", meta_path.display(), e);
            }
        }
        Ok(())
    }

    async fn open(&self, handle: &ArtifactHandle, version: &str) -> Result<ByteStream, BlobError> {
        let (data_path, meta_path) =
            self.entry_paths(handle.destination_id, &handle.folder_name, &handle.title)?;

        let metadata = read_metadata(&meta_path, &handle.title).await?;
        if metadata.entry_id != handle.entry_id {
            return Err(BlobError::NotFound(handle.title.clone()));
        }
        if metadata.version != version {
            return Err(BlobError::VersionMismatch {
                name: handle.title.clone(),
                requested: version.to_string(),
                stored: metadata.version,
            });
        }

        debug!("GET {}", data_path.display());
        let file = match fs::File::open(&data_path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(BlobError::NotFound(handle.title.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Box::pin(file))
    }
}

#[async_trait]
impl TempArtifactStore for LocalArtifactStore {
    async fn create_temp_entry(
        &self,
        destination_id: DestinationId,
        folder_name: &str,
        filename: &str,
        stream: ByteStream,
        content_type: &str,
    ) -> ImportResult<ArtifactHandle> {
        Ok(self
            .create(destination_id, folder_name, filename, stream, content_type)
            .await?)
    }

    async fn list_temp_entry_names(
        &self,
        destination_id: DestinationId,
        folder_name: &str,
    ) -> ImportResult<Vec<String>> {
        Ok(self.list(destination_id, folder_name).await?)
    }

    async fn delete_temp_entry(
        &self,
        destination_id: DestinationId,
        name: &str,
        folder_name: &str,
    ) -> ImportResult<()> {
        Ok(self.delete(destination_id, name, folder_name).await?)
    }

    async fn open_temp_entry_stream(
        &self,
        handle: &ArtifactHandle,
        version: &str,
    ) -> ImportResult<ByteStream> {
        Ok(self.open(handle, version).await?)
    }
}

/// Names must be a single, visible path component
fn validate_component(name: &str) -> Result<(), BlobError> {
    if name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\', '\0'])
    {
        return Err(BlobError::InvalidPath(name.to_string()));
    }
    Ok(())
}

async fn copy_to_file(stream: &mut ByteStream, file: &mut fs::File) -> std::io::Result<u64> {
    let written = tokio::io::copy(stream, file).await?;
    file.flush().await?;
    file.sync_all().await?;
    Ok(written)
}

async fn write_metadata(path: &Path, metadata: &EntryMetadata) -> Result<(), BlobError> {
    let json = serde_json::to_vec_pretty(metadata)?;
    fs::write(path, json).await?;
    Ok(())
}

async fn read_metadata(path: &Path, name: &str) -> Result<EntryMetadata, BlobError> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(BlobError::NotFound(name.to_string()));
        }
        Err(e) => return Err(e.into()),
    };
    Ok(serde_json::from_slice(&bytes)?)
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != ErrorKind::NotFound {
            warn!("Failed to remove {}: {}", path.display(), e);
        }
    }
}
