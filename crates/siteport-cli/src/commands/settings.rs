//! Arguments shared by every command that builds an orchestrator

use anyhow::Context;
use clap::Args;
use siteport_blob::LocalArtifactStore;
use siteport_core::ImportSettings;
use siteport_import::{CatalogDirectory, HttpImportEngine, ImportOrchestrator};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Args, Debug, Clone)]
pub struct ImportArgs {
    /// Data directory for captured uploads and staged bundles
    #[arg(long, env = "SITEPORT_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Largest accepted upload in bytes
    #[arg(long, env = "SITEPORT_MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: Option<u64>,

    /// Staging folder name inside each destination
    #[arg(long, env = "SITEPORT_STAGING_FOLDER")]
    pub staging_folder: Option<String>,

    /// Bound on a single job submission in seconds (0 waits indefinitely)
    #[arg(long, env = "SITEPORT_SUBMISSION_TIMEOUT_SECS")]
    pub submission_timeout_secs: Option<u64>,

    /// JSON catalog of destinations and their lifecycle status
    #[arg(long, env = "SITEPORT_CATALOG")]
    pub catalog: PathBuf,

    /// Base URL of the import engine
    #[arg(long, env = "SITEPORT_ENGINE_URL", default_value = "http://127.0.0.1:8081")]
    pub engine_url: String,
}

impl ImportArgs {
    /// Environment defaults with command-line flags applied on top
    pub fn settings(&self) -> anyhow::Result<ImportSettings> {
        let mut settings = ImportSettings::from_env()?;

        if let Some(data_dir) = &self.data_dir {
            settings.data_dir = data_dir.clone();
        }
        if let Some(max_upload_bytes) = self.max_upload_bytes {
            settings.max_upload_bytes = max_upload_bytes;
        }
        if let Some(staging_folder) = &self.staging_folder {
            settings.staging_folder = staging_folder.trim().to_string();
        }
        if let Some(secs) = self.submission_timeout_secs {
            settings.submission_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn build_orchestrator(&self, settings: &ImportSettings) -> anyhow::Result<Arc<ImportOrchestrator>> {
        let store = Arc::new(LocalArtifactStore::new(settings.staging_root()));
        let directory = Arc::new(CatalogDirectory::new(&self.catalog));
        let engine = Arc::new(
            HttpImportEngine::new(&self.engine_url).context("Failed to create import engine client")?,
        );

        debug!(
            "Orchestrator: data dir {}, catalog {}, engine {}",
            settings.get_data_dir().display(),
            self.catalog.display(),
            self.engine_url
        );

        Ok(Arc::new(ImportOrchestrator::new(
            settings, store, directory, engine,
        )))
    }
}
