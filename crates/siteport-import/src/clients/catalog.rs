//! Destination directory backed by a JSON catalog file
//!
//! The file is re-read on every call so lifecycle changes made by other tools are
//! visible without a restart.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use siteport_import_types::{
    ContentState, Destination, DestinationDirectory, DestinationId, ImportError, ImportResult,
};
use tracing::debug;

/// On-disk catalog layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub destinations: Vec<Destination>,
    #[serde(default)]
    pub content_states: Vec<ContentState>,
}

pub struct CatalogDirectory {
    path: PathBuf,
}

impl CatalogDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> ImportResult<Catalog> {
        let raw = tokio::fs::read(&self.path).await.map_err(|e| {
            ImportError::Directory(format!(
                "Failed to read catalog {}: {}",
                self.path.display(),
                e
            ))
        })?;
        let catalog: Catalog = serde_json::from_slice(&raw)?;
        debug!(
            "Loaded catalog {} ({} destinations)",
            self.path.display(),
            catalog.destinations.len()
        );
        Ok(catalog)
    }
}

#[async_trait]
impl DestinationDirectory for CatalogDirectory {
    async fn list_destinations(&self) -> ImportResult<Vec<Destination>> {
        Ok(self.load().await?.destinations)
    }

    async fn get_content_state(
        &self,
        destination_id: DestinationId,
    ) -> ImportResult<Option<ContentState>> {
        Ok(self
            .load()
            .await?
            .content_states
            .into_iter()
            .find(|state| state.destination_id == destination_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use siteport_import_types::LifecycleStatus;
    use tempfile::TempDir;

    const CATALOG: &str = r#"{
        "destinations": [
            { "id": 10, "display_name": "Spring course", "is_site": true },
            { "id": 11, "display_name": "Staff space", "is_site": false }
        ],
        "content_states": [
            { "destination_id": 10, "name": "Spring course", "lifecycle_status": "DRAFT" }
        ]
    }"#;

    #[tokio::test]
    async fn test_reads_destinations_and_states() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, CATALOG).unwrap();

        let directory = CatalogDirectory::new(&path);
        let destinations = directory.list_destinations().await.unwrap();
        assert_eq!(destinations.len(), 2);
        assert!(destinations[0].is_site);

        let state = directory
            .get_content_state(DestinationId(10))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.lifecycle_status, LifecycleStatus::Draft);
        assert!(directory
            .get_content_state(DestinationId(11))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_missing_file_is_a_directory_error() {
        let dir = TempDir::new().unwrap();
        let directory = CatalogDirectory::new(dir.path().join("absent.json"));

        let result = directory.list_destinations().await;
        assert!(matches!(result, Err(ImportError::Directory(_))));
    }

    #[tokio::test]
    async fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result = CatalogDirectory::new(&path).list_destinations().await;
        assert!(matches!(result, Err(ImportError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_changes_are_picked_up() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, CATALOG).unwrap();
        let directory = CatalogDirectory::new(&path);

        std::fs::write(&path, CATALOG.replace("DRAFT", "PUBLISHED")).unwrap();
        let state = directory
            .get_content_state(DestinationId(10))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.lifecycle_status, LifecycleStatus::Published);
    }
}
