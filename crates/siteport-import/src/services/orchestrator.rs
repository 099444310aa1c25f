//! Import orchestrator service
//!
//! Drives one session's import attempt: validate, stage the captured upload in the
//! temporary artifact store, submit it to the import engine and clean up, whatever
//! the outcome.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use siteport_blob::{guess_content_type, OCTET_STREAM};
use siteport_core::ImportSettings;
use siteport_import_types::{
    ArtifactHandle, ByteStream, Destination, DestinationDirectory, DestinationId, FailureReason,
    ImportEngine, ImportError, ImportJobHandle, ImportOptions, ImportOutcome, ImportResult,
    RejectionReason, TempArtifactStore,
};
use tokio::io::AsyncRead;
use tokio::sync::{Mutex, RwLock};
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, info_span, warn, Instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use super::eligibility::EligibilityFilter;
use super::upload::{PendingUpload, UploadCapture};
use super::{ImportServiceError, ImportServiceResult};

/// Per-session state
#[derive(Debug)]
struct ImportSession {
    session_id: String,
    pending_upload: Option<PendingUpload>,
    /// Eligible destinations, filled on first listing
    destinations: Option<Vec<Destination>>,
    created_at: DateTime<Utc>,
}

/// Public view of a session
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionInfo {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
}

/// What the caller learns about a captured upload
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadReceipt {
    pub filename: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub size_limit_bytes: u64,
}

type StagingKey = (DestinationId, String);

/// Import orchestrator coordinating uploads, staging and job submission
pub struct ImportOrchestrator {
    workflow: StagingWorkflow,
    eligibility: EligibilityFilter,
    capture: UploadCapture,
    sessions: RwLock<HashMap<String, Arc<Mutex<ImportSession>>>>,
    /// Attempts still running, whether or not their caller is waiting
    in_flight: TaskTracker,
}

/// Stage, submit and clean up steps of an attempt, cloned into the task running it
#[derive(Clone)]
struct StagingWorkflow {
    store: Arc<dyn TempArtifactStore>,
    engine: Arc<dyn ImportEngine>,
    staging_folder: String,
    submission_timeout: Option<Duration>,
    /// One lock per staging slot, held from the pre-emptive delete through cleanup
    staging_locks: Arc<Mutex<HashMap<StagingKey, Arc<Mutex<()>>>>>,
}

impl ImportOrchestrator {
    pub fn new(
        settings: &ImportSettings,
        store: Arc<dyn TempArtifactStore>,
        directory: Arc<dyn DestinationDirectory>,
        engine: Arc<dyn ImportEngine>,
    ) -> Self {
        Self {
            workflow: StagingWorkflow {
                store,
                engine,
                staging_folder: settings.staging_folder.clone(),
                submission_timeout: settings.submission_timeout,
                staging_locks: Arc::new(Mutex::new(HashMap::new())),
            },
            eligibility: EligibilityFilter::new(directory),
            capture: UploadCapture::new(settings.upload_dir(), settings.max_upload_bytes),
            sessions: RwLock::new(HashMap::new()),
            in_flight: TaskTracker::new(),
        }
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.capture.max_upload_bytes()
    }

    pub fn staging_folder(&self) -> &str {
        &self.workflow.staging_folder
    }

    /// Start a new session
    pub async fn open_session(&self) -> SessionInfo {
        let session = ImportSession {
            session_id: Uuid::new_v4().to_string(),
            pending_upload: None,
            destinations: None,
            created_at: Utc::now(),
        };
        let info = SessionInfo {
            session_id: session.session_id.clone(),
            created_at: session.created_at,
        };

        self.sessions
            .write()
            .await
            .insert(info.session_id.clone(), Arc::new(Mutex::new(session)));

        debug!("Opened import session {}", info.session_id);
        info
    }

    async fn get_session(&self, session_id: &str) -> ImportServiceResult<Arc<Mutex<ImportSession>>> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| ImportServiceError::SessionNotFound(session_id.to_string()))
    }

    /// Whether at least one destination can currently receive an import
    pub async fn is_upload_enabled(&self, session_id: &str) -> ImportServiceResult<bool> {
        Ok(!self.list_eligible_destinations(session_id).await?.is_empty())
    }

    /// Eligible destinations for the session, computed once and then cached
    pub async fn list_eligible_destinations(
        &self,
        session_id: &str,
    ) -> ImportServiceResult<Vec<Destination>> {
        let session = self.get_session(session_id).await?;
        let mut session = session.lock().await;

        if let Some(destinations) = &session.destinations {
            return Ok(destinations.clone());
        }

        let destinations = self.eligibility.list_eligible_destinations().await;
        session.destinations = Some(destinations.clone());
        Ok(destinations)
    }

    /// Drop the session's cached destination list so the next listing is fresh
    pub async fn refresh_destinations(&self, session_id: &str) -> ImportServiceResult<()> {
        let session = self.get_session(session_id).await?;
        session.lock().await.destinations = None;
        Ok(())
    }

    pub async fn is_eligible(&self, destination_id: DestinationId) -> bool {
        self.eligibility.is_eligible(destination_id).await
    }

    /// Capture an upload into the session, replacing any earlier one.
    ///
    /// The previous upload is discarded whether or not the new capture succeeds.
    pub async fn capture_upload<R>(
        &self,
        session_id: &str,
        filename: &str,
        content_type: &str,
        source: R,
        expected_len: Option<u64>,
    ) -> ImportServiceResult<UploadReceipt>
    where
        R: AsyncRead + Unpin + Send,
    {
        let session = self.get_session(session_id).await?;
        let mut session = session.lock().await;

        if let Some(previous) = session.pending_upload.take() {
            debug!(
                "Discarding previous upload {} in session {}",
                previous.filename(),
                session.session_id
            );
            previous.release().await;
        }

        let upload = self
            .capture
            .capture(filename, content_type, source, expected_len)
            .await
            .map_err(|e| {
                warn!("Upload capture failed in session {}: {}", session.session_id, e);
                e
            })?;

        let receipt = UploadReceipt {
            filename: upload.filename().to_string(),
            content_type: upload.content_type().to_string(),
            size_bytes: upload.size_bytes(),
            size_limit_bytes: upload.size_limit_bytes(),
        };
        info!(
            "Captured upload {} ({} bytes) in session {}",
            receipt.filename, receipt.size_bytes, session.session_id
        );
        session.pending_upload = Some(upload);

        Ok(receipt)
    }

    /// Run one import attempt for the session.
    ///
    /// Collaborator failures never surface as errors here; they end in
    /// `ImportOutcome::Failed`. The only error is an unknown session.
    ///
    /// The attempt runs on its own task. Dropping the returned future does not
    /// cancel it, so staging cleanup and the upload release still happen.
    pub async fn run_import(
        &self,
        session_id: &str,
        destination_id: Option<&str>,
    ) -> ImportServiceResult<ImportOutcome> {
        let session = self.get_session(session_id).await?;
        let mut session = session.lock().await;

        let Some(destination_id) = DestinationId::parse_selection(destination_id) else {
            info!("Import rejected in session {}: no destination selected", session_id);
            return Ok(ImportOutcome::rejected(
                RejectionReason::NoDestinationSelected,
            ));
        };

        let Some(upload) = session.pending_upload.take() else {
            info!("Import rejected in session {}: no upload present", session_id);
            return Ok(ImportOutcome::rejected(RejectionReason::NoUploadPresent));
        };

        let span = info_span!(
            "run_import",
            session_id = %session.session_id,
            destination_id = %destination_id
        );
        let attempt = self
            .in_flight
            .spawn(self.workflow.clone().attempt(destination_id, upload).instrument(span));

        match attempt.await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!("Import attempt in session {} did not finish: {}", session_id, e);
                Ok(ImportOutcome::failed(FailureReason::SubmissionFailed))
            }
        }
    }

    /// Release the session and its pending upload. Unknown sessions are ignored.
    pub async fn dispose(&self, session_id: &str) -> bool {
        let removed = self.sessions.write().await.remove(session_id);
        match removed {
            Some(session) => {
                release_session(&session).await;
                debug!("Disposed import session {}", session_id);
                true
            }
            None => false,
        }
    }

    /// Dispose every open session, then wait for running attempts to clean up
    pub async fn shutdown(&self) {
        let sessions: Vec<_> = self.sessions.write().await.drain().collect();
        for (_, session) in &sessions {
            release_session(session).await;
        }
        info!("Released {} import sessions", sessions.len());

        self.in_flight.close();
        if !self.in_flight.is_empty() {
            info!("Waiting for {} import attempts to finish", self.in_flight.len());
        }
        self.in_flight.wait().await;
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    #[cfg(test)]
    async fn staging_slot_count(&self) -> usize {
        self.workflow.staging_locks.lock().await.len()
    }
}

impl StagingWorkflow {
    async fn staging_lock(&self, key: &StagingKey) -> Arc<Mutex<()>> {
        self.staging_locks
            .lock()
            .await
            .entry(key.clone())
            .or_default()
            .clone()
    }

    /// Forget the slot's lock once no other attempt holds or waits on it
    async fn release_staging_lock(&self, key: &StagingKey, slot: Arc<Mutex<()>>) {
        let mut locks = self.staging_locks.lock().await;
        // The map and this attempt are the only owners
        if Arc::strong_count(&slot) == 2 {
            locks.remove(key);
        }
    }

    /// Stage, submit and clean up, holding the staging slot throughout
    async fn attempt(self, destination_id: DestinationId, upload: PendingUpload) -> ImportOutcome {
        let key = (destination_id, self.staging_folder.clone());
        let slot = self.staging_lock(&key).await;

        let outcome = {
            let _guard = slot.lock().await;
            let outcome = self.stage_and_submit(destination_id, &upload).await;
            if let Err(e) = self.clear_staging(destination_id).await {
                warn!("Cleanup of staged bundle left entries behind: {}", e);
            }
            outcome
        };
        self.release_staging_lock(&key, slot).await;
        upload.release().await;

        match &outcome {
            ImportOutcome::Succeeded { job_id } => info!("Import job {} accepted", job_id),
            ImportOutcome::Failed { reason } => warn!("Import attempt failed: {}", reason),
            ImportOutcome::Rejected { .. } => {}
        }
        outcome
    }

    async fn stage_and_submit(
        &self,
        destination_id: DestinationId,
        upload: &PendingUpload,
    ) -> ImportOutcome {
        if let Err(e) = self.clear_staging(destination_id).await {
            error!("Failed to clear staging folder before import: {}", e);
            return ImportOutcome::failed(FailureReason::StagingFailed);
        }

        let handle = match self.stage(destination_id, upload).await {
            Ok(handle) => handle,
            Err(e) => {
                error!("Failed to stage upload {}: {}", upload.filename(), e);
                return ImportOutcome::failed(FailureReason::StagingFailed);
            }
        };

        match self.submit(&handle, upload.filename()).await {
            Ok(job) => ImportOutcome::Succeeded { job_id: job.job_id },
            Err(e) => {
                error!("Failed to submit import job for {}: {}", upload.filename(), e);
                ImportOutcome::failed(FailureReason::SubmissionFailed)
            }
        }
    }

    /// Stage the upload under its durable name; the client's filename only
    /// picks the content type.
    async fn stage(
        &self,
        destination_id: DestinationId,
        upload: &PendingUpload,
    ) -> ImportResult<ArtifactHandle> {
        let file = tokio::fs::File::open(upload.path()).await?;
        let stream: ByteStream = Box::pin(file);
        let content_type = guess_content_type(upload.filename()).unwrap_or(OCTET_STREAM);

        let handle = self
            .store
            .create_temp_entry(
                destination_id,
                &self.staging_folder,
                upload.durable_name(),
                stream,
                content_type,
            )
            .await?;

        debug!(
            "Staged {} as entry {} ({})",
            upload.filename(),
            handle.entry_id,
            handle.content_type
        );
        Ok(handle)
    }

    async fn submit(&self, handle: &ArtifactHandle, title: &str) -> ImportResult<ImportJobHandle> {
        let stream = self
            .store
            .open_temp_entry_stream(handle, &handle.version)
            .await?;
        let options = ImportOptions::build_default();

        let submission = self
            .engine
            .submit_import_job(title, handle.destination_id, &options, stream);

        match self.submission_timeout {
            Some(limit) => tokio::time::timeout(limit, submission)
                .await
                .map_err(|_| {
                    ImportError::Engine(format!("submission timed out after {:?}", limit))
                })?,
            None => submission.await,
        }
    }

    /// Delete every entry in the destination's staging folder.
    ///
    /// Tries all entries and reports the last failure.
    async fn clear_staging(&self, destination_id: DestinationId) -> ImportResult<()> {
        let names = self
            .store
            .list_temp_entry_names(destination_id, &self.staging_folder)
            .await?;

        let mut last_error = None;
        for name in names {
            match self
                .store
                .delete_temp_entry(destination_id, &name, &self.staging_folder)
                .await
            {
                Ok(()) => debug!("Deleted staged entry {}", name),
                Err(e) => {
                    warn!("Failed to delete staged entry {}: {}", name, e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

async fn release_session(session: &Mutex<ImportSession>) {
    let mut session = session.lock().await;
    session.destinations = None;
    if let Some(upload) = session.pending_upload.take() {
        upload.release().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{FakeDirectory, FakeEngine, FakeStore};
    use crate::services::CaptureError;
    use siteport_import_types::LifecycleStatus;
    use std::io::Cursor;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    const FOLDER: &str = "export-import-temp";

    struct Harness {
        orchestrator: ImportOrchestrator,
        store: Arc<FakeStore>,
        engine: Arc<FakeEngine>,
        dir: TempDir,
    }

    impl Harness {
        fn upload_dir(&self) -> PathBuf {
            self.dir.path().join("uploads")
        }
    }

    fn settings(dir: &Path) -> ImportSettings {
        ImportSettings {
            data_dir: dir.to_path_buf(),
            max_upload_bytes: 1024,
            staging_folder: FOLDER.to_string(),
            submission_timeout: None,
        }
    }

    fn draft_directory() -> FakeDirectory {
        FakeDirectory::new()
            .with_site(1, "Draft course", Some(LifecycleStatus::Draft))
            .with_site(2, "Published course", Some(LifecycleStatus::Published))
    }

    fn harness_with(store: FakeStore, engine: FakeEngine, timeout: Option<Duration>) -> Harness {
        let dir = TempDir::new().unwrap();
        let mut settings = settings(dir.path());
        settings.submission_timeout = timeout;

        let store = Arc::new(store);
        let engine = Arc::new(engine);
        let orchestrator = ImportOrchestrator::new(
            &settings,
            store.clone(),
            Arc::new(draft_directory()),
            engine.clone(),
        );
        Harness {
            orchestrator,
            store,
            engine,
            dir,
        }
    }

    fn harness() -> Harness {
        harness_with(FakeStore::new(), FakeEngine::new(), None)
    }

    fn upload_files(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    async fn upload(h: &Harness, session_id: &str, filename: &str, bytes: &[u8]) {
        h.orchestrator
            .capture_upload(
                session_id,
                filename,
                "application/octet-stream",
                Cursor::new(bytes.to_vec()),
                Some(bytes.len() as u64),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_successful_import_leaves_no_residue() {
        let h = harness();
        let session = h.orchestrator.open_session().await;
        upload(&h, &session.session_id, "bundle.zip", b"PK\x03\x04bundle").await;

        let outcome = h
            .orchestrator
            .run_import(&session.session_id, Some("1"))
            .await
            .unwrap();

        assert!(outcome.is_success());
        assert_eq!(outcome.message(), "Your request completed successfully.");
        assert_eq!(h.store.content_types(), vec!["application/zip".to_string()]);
        assert!(h.store.names(DestinationId(1), FOLDER).is_empty());
        assert_eq!(upload_files(&h.upload_dir()), 0);

        let submissions = h.engine.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].title, "bundle.zip");
        assert_eq!(submissions[0].destination_id, DestinationId(1));
        assert_eq!(submissions[0].bytes, b"PK\x03\x04bundle");
        assert_eq!(submissions[0].options, ImportOptions::build_default());

        let staged = h.store.created_names();
        assert_eq!(staged.len(), 1);
        assert!(staged[0].starts_with("siteport-larimport-"));
        assert!(staged[0].ends_with(".lar"));
    }

    #[tokio::test]
    async fn test_unusual_client_filenames_stage_under_durable_name() {
        let h = harness();
        let session = h.orchestrator.open_session().await;
        let long_name = format!("{}.zip", "a".repeat(300));

        for filename in [".site-export.lar", long_name.as_str()] {
            upload(&h, &session.session_id, filename, b"bundle").await;
            let outcome = h
                .orchestrator
                .run_import(&session.session_id, Some("1"))
                .await
                .unwrap();
            assert!(outcome.is_success(), "{} failed: {:?}", filename, outcome);
        }

        assert!(h
            .store
            .created_names()
            .iter()
            .all(|name| name.starts_with("siteport-larimport-")));
        let titles: Vec<String> = h.engine.submissions().into_iter().map(|s| s.title).collect();
        assert_eq!(titles, vec![".site-export.lar".to_string(), long_name]);
        assert_eq!(h.store.content_types()[1], "application/zip");
    }

    #[tokio::test]
    async fn test_dropped_caller_still_cleans_up() {
        let (engine, gate) = FakeEngine::gated();
        let h = harness_with(FakeStore::new(), engine, None);
        let session = h.orchestrator.open_session().await;
        upload(&h, &session.session_id, "bundle.zip", b"data").await;

        let abandoned = tokio::time::timeout(
            Duration::from_millis(200),
            h.orchestrator.run_import(&session.session_id, Some("1")),
        )
        .await;
        assert!(abandoned.is_err());
        assert_eq!(h.store.names(DestinationId(1), FOLDER).len(), 1);

        // The session no longer owns the upload
        assert!(h.orchestrator.dispose(&session.session_id).await);

        gate.notify_one();
        h.orchestrator.shutdown().await;

        assert_eq!(h.engine.submissions().len(), 1);
        assert!(h.store.names(DestinationId(1), FOLDER).is_empty());
        assert_eq!(upload_files(&h.upload_dir()), 0);
        assert_eq!(h.orchestrator.staging_slot_count().await, 0);
    }

    #[tokio::test]
    async fn test_staging_slots_are_forgotten_after_attempts() {
        let h = harness();
        let session = h.orchestrator.open_session().await;

        for destination in ["1", "2"] {
            upload(&h, &session.session_id, "bundle.zip", b"data").await;
            h.orchestrator
                .run_import(&session.session_id, Some(destination))
                .await
                .unwrap();
            assert_eq!(h.orchestrator.staging_slot_count().await, 0);
        }
    }

    #[tokio::test]
    async fn test_missing_upload_never_touches_store() {
        let h = harness();
        let session = h.orchestrator.open_session().await;

        let outcome = h
            .orchestrator
            .run_import(&session.session_id, Some("1"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ImportOutcome::rejected(RejectionReason::NoUploadPresent)
        );
        assert_eq!(outcome.message(), "No file uploaded");
        assert_eq!(h.store.calls(), 0);
        assert!(h.engine.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_blank_destination_rejected_before_staging() {
        let h = harness();
        let session = h.orchestrator.open_session().await;
        upload(&h, &session.session_id, "bundle.zip", b"data").await;

        for selection in [None, Some(""), Some("   "), Some("not-a-number")] {
            let outcome = h
                .orchestrator
                .run_import(&session.session_id, selection)
                .await
                .unwrap();
            assert_eq!(
                outcome,
                ImportOutcome::rejected(RejectionReason::NoDestinationSelected)
            );
        }
        assert_eq!(h.store.calls(), 0);

        // The upload is still there for a corrected attempt
        let outcome = h
            .orchestrator
            .run_import(&session.session_id, Some("1"))
            .await
            .unwrap();
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn test_repeated_runs_each_succeed() {
        let h = harness();
        let session = h.orchestrator.open_session().await;

        for round in 0..3 {
            upload(&h, &session.session_id, "bundle.zip", format!("round {}", round).as_bytes())
                .await;
            let outcome = h
                .orchestrator
                .run_import(&session.session_id, Some("1"))
                .await
                .unwrap();
            assert!(outcome.is_success(), "round {} failed: {:?}", round, outcome);
        }

        assert_eq!(h.engine.submissions().len(), 3);
        assert!(h.store.names(DestinationId(1), FOLDER).is_empty());
    }

    #[tokio::test]
    async fn test_upload_is_consumed_by_a_run() {
        let h = harness();
        let session = h.orchestrator.open_session().await;
        upload(&h, &session.session_id, "bundle.zip", b"data").await;

        h.orchestrator
            .run_import(&session.session_id, Some("1"))
            .await
            .unwrap();
        let second = h
            .orchestrator
            .run_import(&session.session_id, Some("1"))
            .await
            .unwrap();

        assert_eq!(
            second,
            ImportOutcome::rejected(RejectionReason::NoUploadPresent)
        );
    }

    #[tokio::test]
    async fn test_create_failure_fails_staging_and_releases_upload() {
        let h = harness_with(FakeStore::new().failing_create(), FakeEngine::new(), None);
        let session = h.orchestrator.open_session().await;
        upload(&h, &session.session_id, "bundle.zip", b"data").await;
        assert_eq!(upload_files(&h.upload_dir()), 1);

        let outcome = h
            .orchestrator
            .run_import(&session.session_id, Some("1"))
            .await
            .unwrap();

        assert_eq!(outcome, ImportOutcome::failed(FailureReason::StagingFailed));
        assert_eq!(outcome.message(), "An unexpected error occurred.");
        assert_eq!(h.store.creates(), 1);
        assert_eq!(upload_files(&h.upload_dir()), 0);
        assert!(h.engine.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_leftover_entries_are_removed_before_staging() {
        let h = harness();
        h.store
            .seed(DestinationId(1), FOLDER, "bundle.zip", b"stale attempt");
        h.store
            .seed(DestinationId(1), FOLDER, "other.lar", b"stale attempt");

        let session = h.orchestrator.open_session().await;
        upload(&h, &session.session_id, "bundle.zip", b"fresh").await;

        let outcome = h
            .orchestrator
            .run_import(&session.session_id, Some("1"))
            .await
            .unwrap();

        assert!(outcome.is_success());
        assert_eq!(h.engine.submissions()[0].bytes, b"fresh");
        assert!(h.store.names(DestinationId(1), FOLDER).is_empty());
    }

    #[tokio::test]
    async fn test_pre_delete_failure_fails_staging() {
        let h = harness_with(FakeStore::new().failing_delete(), FakeEngine::new(), None);
        h.store.seed(DestinationId(1), FOLDER, "stuck.lar", b"x");
        let session = h.orchestrator.open_session().await;
        upload(&h, &session.session_id, "bundle.zip", b"data").await;

        let outcome = h
            .orchestrator
            .run_import(&session.session_id, Some("1"))
            .await
            .unwrap();

        assert_eq!(outcome, ImportOutcome::failed(FailureReason::StagingFailed));
        assert_eq!(h.store.creates(), 0);
        // One attempt before staging, one during cleanup
        assert_eq!(h.store.deletes(), 2);
        assert_eq!(upload_files(&h.upload_dir()), 0);
    }

    #[tokio::test]
    async fn test_engine_failure_fails_submission_and_cleans_up() {
        let h = harness_with(FakeStore::new(), FakeEngine::failing(), None);
        let session = h.orchestrator.open_session().await;
        upload(&h, &session.session_id, "bundle.zip", b"data").await;

        let outcome = h
            .orchestrator
            .run_import(&session.session_id, Some("1"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ImportOutcome::failed(FailureReason::SubmissionFailed)
        );
        assert!(h.store.names(DestinationId(1), FOLDER).is_empty());
        assert_eq!(upload_files(&h.upload_dir()), 0);
    }

    #[tokio::test]
    async fn test_open_failure_fails_submission_and_cleans_up() {
        let h = harness_with(FakeStore::new().failing_open(), FakeEngine::new(), None);
        let session = h.orchestrator.open_session().await;
        upload(&h, &session.session_id, "bundle.zip", b"data").await;

        let outcome = h
            .orchestrator
            .run_import(&session.session_id, Some("1"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ImportOutcome::failed(FailureReason::SubmissionFailed)
        );
        assert!(h.store.names(DestinationId(1), FOLDER).is_empty());
    }

    #[tokio::test]
    async fn test_submission_timeout_fails_submission() {
        let h = harness_with(
            FakeStore::new(),
            FakeEngine::hanging(),
            Some(Duration::from_millis(50)),
        );
        let session = h.orchestrator.open_session().await;
        upload(&h, &session.session_id, "bundle.zip", b"data").await;

        let outcome = h
            .orchestrator
            .run_import(&session.session_id, Some("1"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ImportOutcome::failed(FailureReason::SubmissionFailed)
        );
        assert!(h.store.names(DestinationId(1), FOLDER).is_empty());
    }

    #[tokio::test]
    async fn test_published_destination_is_hidden_but_still_importable() {
        let h = harness();
        let session = h.orchestrator.open_session().await;

        let listed = h
            .orchestrator
            .list_eligible_destinations(&session.session_id)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, DestinationId(1));
        assert!(!h.orchestrator.is_eligible(DestinationId(2)).await);

        upload(&h, &session.session_id, "bundle.zip", b"data").await;
        let outcome = h
            .orchestrator
            .run_import(&session.session_id, Some("2"))
            .await
            .unwrap();
        assert!(outcome.is_success());
        assert_eq!(h.engine.submissions()[0].destination_id, DestinationId(2));
    }

    #[tokio::test]
    async fn test_upload_enabled_follows_eligible_destinations() {
        let dir = TempDir::new().unwrap();
        let orchestrator = ImportOrchestrator::new(
            &settings(dir.path()),
            Arc::new(FakeStore::new()),
            Arc::new(
                FakeDirectory::new().with_site(2, "Published", Some(LifecycleStatus::Published)),
            ),
            Arc::new(FakeEngine::new()),
        );
        let session = orchestrator.open_session().await;
        assert!(!orchestrator
            .is_upload_enabled(&session.session_id)
            .await
            .unwrap());

        let h = harness();
        let session = h.orchestrator.open_session().await;
        assert!(h
            .orchestrator
            .is_upload_enabled(&session.session_id)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_new_capture_replaces_previous_upload() {
        let h = harness();
        let session = h.orchestrator.open_session().await;
        upload(&h, &session.session_id, "first.zip", b"first").await;
        upload(&h, &session.session_id, "second.zip", b"second").await;

        assert_eq!(upload_files(&h.upload_dir()), 1);

        h.orchestrator
            .run_import(&session.session_id, Some("1"))
            .await
            .unwrap();
        let submissions = h.engine.submissions();
        assert_eq!(submissions[0].title, "second.zip");
        assert_eq!(submissions[0].bytes, b"second");
    }

    #[tokio::test]
    async fn test_failed_capture_discards_previous_upload() {
        let h = harness();
        let session = h.orchestrator.open_session().await;
        upload(&h, &session.session_id, "first.zip", b"first").await;

        let result = h
            .orchestrator
            .capture_upload(
                &session.session_id,
                "huge.zip",
                "application/zip",
                Cursor::new(vec![0u8; 2048]),
                None,
            )
            .await;

        assert!(matches!(
            result,
            Err(ImportServiceError::Capture(CaptureError::SizeExceeded { .. }))
        ));
        assert_eq!(upload_files(&h.upload_dir()), 0);

        let outcome = h
            .orchestrator
            .run_import(&session.session_id, Some("1"))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ImportOutcome::rejected(RejectionReason::NoUploadPresent)
        );
    }

    #[tokio::test]
    async fn test_dispose_releases_upload_and_is_idempotent() {
        let h = harness();
        let session = h.orchestrator.open_session().await;
        upload(&h, &session.session_id, "bundle.zip", b"data").await;

        assert!(h.orchestrator.dispose(&session.session_id).await);
        assert!(!h.orchestrator.dispose(&session.session_id).await);
        assert_eq!(upload_files(&h.upload_dir()), 0);
        assert_eq!(h.store.calls(), 0);

        let result = h.orchestrator.run_import(&session.session_id, Some("1")).await;
        assert!(matches!(result, Err(ImportServiceError::SessionNotFound(_))));
    }

    #[tokio::test]
    async fn test_shutdown_releases_every_session() {
        let h = harness();
        for _ in 0..3 {
            let session = h.orchestrator.open_session().await;
            upload(&h, &session.session_id, "bundle.zip", b"data").await;
        }
        assert_eq!(upload_files(&h.upload_dir()), 3);

        h.orchestrator.shutdown().await;

        assert_eq!(h.orchestrator.session_count().await, 0);
        assert_eq!(upload_files(&h.upload_dir()), 0);
    }

    #[tokio::test]
    async fn test_destination_list_is_cached_until_refresh() {
        let h = harness();
        let session = h.orchestrator.open_session().await;

        let first = h
            .orchestrator
            .list_eligible_destinations(&session.session_id)
            .await
            .unwrap();
        let cached = h
            .orchestrator
            .list_eligible_destinations(&session.session_id)
            .await
            .unwrap();
        assert_eq!(first, cached);

        h.orchestrator
            .refresh_destinations(&session.session_id)
            .await
            .unwrap();
        let refreshed = h
            .orchestrator
            .list_eligible_destinations(&session.session_id)
            .await
            .unwrap();
        assert_eq!(first, refreshed);
    }

    #[tokio::test]
    async fn test_concurrent_sessions_on_same_destination_both_succeed() {
        let h = harness();
        let a = h.orchestrator.open_session().await;
        let b = h.orchestrator.open_session().await;
        upload(&h, &a.session_id, "a.zip", b"from a").await;
        upload(&h, &b.session_id, "b.zip", b"from b").await;

        // The fakes yield mid-attempt, so both attempts interleave
        let (ra, rb) = tokio::join!(
            h.orchestrator.run_import(&a.session_id, Some("1")),
            h.orchestrator.run_import(&b.session_id, Some("1")),
        );

        assert!(ra.unwrap().is_success());
        assert!(rb.unwrap().is_success());
        let mut submitted: Vec<(String, Vec<u8>)> = h
            .engine
            .submissions()
            .into_iter()
            .map(|s| (s.title, s.bytes))
            .collect();
        submitted.sort();
        assert_eq!(
            submitted,
            vec![
                ("a.zip".to_string(), b"from a".to_vec()),
                ("b.zip".to_string(), b"from b".to_vec()),
            ]
        );
        assert_eq!(h.store.creates(), 2);
        assert!(h.store.names(DestinationId(1), FOLDER).is_empty());
        assert_eq!(h.orchestrator.staging_slot_count().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_session_is_reported() {
        let h = harness();
        let result = h.orchestrator.list_eligible_destinations("missing").await;
        assert!(matches!(result, Err(ImportServiceError::SessionNotFound(_))));
    }
}
