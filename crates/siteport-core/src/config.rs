//! Configuration for the import service

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// Well-known paths relative to data_dir
pub const UPLOADS_DIR_NAME: &str = "uploads";
pub const STAGING_DIR_NAME: &str = "staging";

/// Folder inside a destination's temporary area that holds staged bundles
pub const DEFAULT_STAGING_FOLDER: &str = "export-import-temp";
/// Upper bound for a captured upload (100 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

pub const ENV_DATA_DIR: &str = "SITEPORT_DATA_DIR";
pub const ENV_MAX_UPLOAD_BYTES: &str = "SITEPORT_MAX_UPLOAD_BYTES";
pub const ENV_STAGING_FOLDER: &str = "SITEPORT_STAGING_FOLDER";
pub const ENV_SUBMISSION_TIMEOUT_SECS: &str = "SITEPORT_SUBMISSION_TIMEOUT_SECS";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Invalid configuration: {details}")]
    InvalidConfiguration { details: String },
}

/// Settings shared by upload capture, staging and job submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSettings {
    /// Root directory for captured uploads and the local artifact store
    pub data_dir: PathBuf,
    /// Largest upload accepted at capture time
    pub max_upload_bytes: u64,
    /// Folder name used for the per-destination staging slot
    pub staging_folder: String,
    /// Bound on a single job submission; `None` waits indefinitely
    pub submission_timeout: Option<Duration>,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            staging_folder: DEFAULT_STAGING_FOLDER.to_string(),
            submission_timeout: None,
        }
    }
}

impl ImportSettings {
    /// Build settings from `SITEPORT_*` environment variables, falling back to defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|v| !v.trim().is_empty()) {
            settings.data_dir = PathBuf::from(dir);
        }

        if let Some(raw) = lookup(ENV_MAX_UPLOAD_BYTES) {
            settings.max_upload_bytes = parse_number(ENV_MAX_UPLOAD_BYTES, &raw)?;
        }

        if let Some(folder) = lookup(ENV_STAGING_FOLDER) {
            settings.staging_folder = folder.trim().to_string();
        }

        if let Some(raw) = lookup(ENV_SUBMISSION_TIMEOUT_SECS) {
            let secs = parse_number(ENV_SUBMISSION_TIMEOUT_SECS, &raw)?;
            settings.submission_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::InvalidConfiguration {
                details: "max_upload_bytes must be greater than zero".to_string(),
            });
        }
        if self.staging_folder.is_empty()
            || self.staging_folder.starts_with('.')
            || self.staging_folder.contains(['/', '\\', '\0'])
        {
            return Err(ConfigError::InvalidConfiguration {
                details: format!("staging folder '{}' is not a plain name", self.staging_folder),
            });
        }
        Ok(())
    }

    pub fn get_data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Directory holding the durable copies of captured uploads
    pub fn upload_dir(&self) -> PathBuf {
        self.data_dir.join(UPLOADS_DIR_NAME)
    }

    /// Root of the local temporary artifact store
    pub fn staging_root(&self) -> PathBuf {
        self.data_dir.join(STAGING_DIR_NAME)
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".siteport"))
        .unwrap_or_else(|| PathBuf::from(".siteport"))
}

fn parse_number(key: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
    })
}
