//! In-memory collaborators for unit tests

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use siteport_import_types::{
    ArtifactHandle, ByteStream, ContentState, Destination, DestinationDirectory, DestinationId,
    ImportEngine, ImportError, ImportJobHandle, ImportOptions, ImportResult, LifecycleStatus,
    TempArtifactStore,
};
use tokio::io::AsyncReadExt;
use tokio::sync::Notify;

#[derive(Default)]
pub struct FakeDirectory {
    destinations: Vec<Destination>,
    states: HashMap<DestinationId, ContentState>,
    failing_states: HashSet<DestinationId>,
    fail_listing: bool,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn with(mut self, id: i64, name: &str, is_site: bool, status: Option<LifecycleStatus>) -> Self {
        let id = DestinationId(id);
        self.destinations.push(Destination {
            id,
            display_name: name.to_string(),
            is_site,
        });
        if let Some(lifecycle_status) = status {
            self.states.entry(id).or_insert(ContentState {
                destination_id: id,
                name: format!("{} product", name),
                lifecycle_status,
            });
        }
        self
    }

    pub fn with_site(self, id: i64, name: &str, status: Option<LifecycleStatus>) -> Self {
        self.with(id, name, true, status)
    }

    pub fn with_non_site(self, id: i64, name: &str, status: Option<LifecycleStatus>) -> Self {
        self.with(id, name, false, status)
    }

    pub fn failing_state_lookup(mut self, id: i64) -> Self {
        self.failing_states.insert(DestinationId(id));
        self
    }

    pub fn failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }
}

#[async_trait]
impl DestinationDirectory for FakeDirectory {
    async fn list_destinations(&self) -> ImportResult<Vec<Destination>> {
        if self.fail_listing {
            return Err(ImportError::Directory("directory offline".to_string()));
        }
        Ok(self.destinations.clone())
    }

    async fn get_content_state(
        &self,
        destination_id: DestinationId,
    ) -> ImportResult<Option<ContentState>> {
        if self.failing_states.contains(&destination_id) {
            return Err(ImportError::Directory("lookup failed".to_string()));
        }
        Ok(self.states.get(&destination_id).cloned())
    }
}

type FolderKey = (DestinationId, String);

/// Artifact store keeping entries in memory and counting every call
#[derive(Default)]
pub struct FakeStore {
    folders: Mutex<HashMap<FolderKey, BTreeMap<String, Vec<u8>>>>,
    fail_create: bool,
    fail_open: bool,
    fail_delete: bool,
    calls: AtomicUsize,
    creates: AtomicUsize,
    deletes: AtomicUsize,
    content_types: Mutex<Vec<String>>,
    created_names: Mutex<Vec<String>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub fn failing_delete(mut self) -> Self {
        self.fail_delete = true;
        self
    }

    /// Put an entry in place without going through the trait
    pub fn seed(&self, destination_id: DestinationId, folder: &str, name: &str, bytes: &[u8]) {
        self.folders
            .lock()
            .unwrap()
            .entry((destination_id, folder.to_string()))
            .or_default()
            .insert(name.to_string(), bytes.to_vec());
    }

    pub fn names(&self, destination_id: DestinationId, folder: &str) -> Vec<String> {
        self.folders
            .lock()
            .unwrap()
            .get(&(destination_id, folder.to_string()))
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    /// Content types passed to every create call, in order
    pub fn content_types(&self) -> Vec<String> {
        self.content_types.lock().unwrap().clone()
    }

    /// Entry names passed to every create call, in order
    pub fn created_names(&self) -> Vec<String> {
        self.created_names.lock().unwrap().clone()
    }
}

#[async_trait]
impl TempArtifactStore for FakeStore {
    async fn create_temp_entry(
        &self,
        destination_id: DestinationId,
        folder_name: &str,
        filename: &str,
        mut stream: ByteStream,
        content_type: &str,
    ) -> ImportResult<ArtifactHandle> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.content_types
            .lock()
            .unwrap()
            .push(content_type.to_string());
        self.created_names
            .lock()
            .unwrap()
            .push(filename.to_string());
        if self.fail_create {
            return Err(ImportError::Storage("quota exceeded".to_string()));
        }

        let mut bytes = Vec::new();
        stream.read_to_end(&mut bytes).await?;
        let size_bytes = bytes.len() as u64;

        {
            let mut folders = self.folders.lock().unwrap();
            let folder = folders
                .entry((destination_id, folder_name.to_string()))
                .or_default();
            if folder.contains_key(filename) {
                return Err(ImportError::DuplicateEntry(filename.to_string()));
            }
            folder.insert(filename.to_string(), bytes);
        }
        // Let other attempts run while the entry sits in the folder
        tokio::task::yield_now().await;

        Ok(ArtifactHandle {
            entry_id: format!("entry-{}", filename),
            destination_id,
            folder_name: folder_name.to_string(),
            title: filename.to_string(),
            version: "1.0".to_string(),
            content_type: content_type.to_string(),
            size_bytes,
        })
    }

    async fn list_temp_entry_names(
        &self,
        destination_id: DestinationId,
        folder_name: &str,
    ) -> ImportResult<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.names(destination_id, folder_name))
    }

    async fn delete_temp_entry(
        &self,
        destination_id: DestinationId,
        name: &str,
        folder_name: &str,
    ) -> ImportResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete {
            return Err(ImportError::Storage("delete refused".to_string()));
        }
        let mut folders = self.folders.lock().unwrap();
        match folders
            .get_mut(&(destination_id, folder_name.to_string()))
            .and_then(|folder| folder.remove(name))
        {
            Some(_) => Ok(()),
            None => Err(ImportError::NotFound(name.to_string())),
        }
    }

    async fn open_temp_entry_stream(
        &self,
        handle: &ArtifactHandle,
        _version: &str,
    ) -> ImportResult<ByteStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_open {
            return Err(ImportError::Storage("entry unreadable".to_string()));
        }
        let folders = self.folders.lock().unwrap();
        let bytes = folders
            .get(&(handle.destination_id, handle.folder_name.clone()))
            .and_then(|folder| folder.get(&handle.title))
            .cloned()
            .ok_or_else(|| ImportError::NotFound(handle.title.clone()))?;
        Ok(Box::pin(Cursor::new(bytes)))
    }
}

#[derive(Debug, Clone)]
pub struct Submission {
    pub title: String,
    pub destination_id: DestinationId,
    pub options: ImportOptions,
    pub bytes: Vec<u8>,
}

#[derive(Default)]
pub struct FakeEngine {
    submissions: Mutex<Vec<Submission>>,
    fail: bool,
    hang: bool,
    gate: Option<Arc<Notify>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Never answers a submission
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::default()
        }
    }

    /// Holds every submission until the returned gate is notified
    pub fn gated() -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let engine = Self {
            gate: Some(gate.clone()),
            ..Self::default()
        };
        (engine, gate)
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImportEngine for FakeEngine {
    async fn submit_import_job(
        &self,
        title: &str,
        destination_id: DestinationId,
        options: &ImportOptions,
        mut stream: ByteStream,
    ) -> ImportResult<ImportJobHandle> {
        if self.hang {
            futures::future::pending::<()>().await;
        }
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        tokio::task::yield_now().await;
        if self.fail {
            return Err(ImportError::Engine("engine rejected job".to_string()));
        }

        let mut bytes = Vec::new();
        stream.read_to_end(&mut bytes).await?;

        let mut submissions = self.submissions.lock().unwrap();
        submissions.push(Submission {
            title: title.to_string(),
            destination_id,
            options: options.clone(),
            bytes,
        });
        Ok(ImportJobHandle::accepted(format!("job-{}", submissions.len())))
    }
}
