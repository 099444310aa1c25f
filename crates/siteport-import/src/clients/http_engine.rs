//! Import engine reached over HTTP
//!
//! Submits `POST {base_url}/imports` as multipart with the fields `title`,
//! `destination_id`, `options` (JSON) and `bundle` (the staged bytes, streamed).

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use siteport_import_types::{
    ByteStream, DestinationId, ImportEngine, ImportError, ImportJobHandle, ImportOptions,
    ImportResult,
};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

const BUNDLE_CONTENT_TYPE: &str = "application/octet-stream";

/// Engine reply to an accepted submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitJobResponse {
    pub job_id: String,
    #[serde(default)]
    pub accepted_at: Option<DateTime<Utc>>,
}

pub struct HttpImportEngine {
    client: reqwest::Client,
    base_url: String,
}

impl HttpImportEngine {
    pub fn new(base_url: &str) -> ImportResult<Self> {
        Self::with_connect_timeout(base_url, Duration::from_secs(10))
    }

    pub fn with_connect_timeout(base_url: &str, connect_timeout: Duration) -> ImportResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| ImportError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ImportEngine for HttpImportEngine {
    async fn submit_import_job(
        &self,
        title: &str,
        destination_id: DestinationId,
        options: &ImportOptions,
        stream: ByteStream,
    ) -> ImportResult<ImportJobHandle> {
        let url = format!("{}/imports", self.base_url);
        let body = reqwest::Body::wrap_stream(ReaderStream::new(stream));
        let bundle = Part::stream(body)
            .file_name(title.to_string())
            .mime_str(BUNDLE_CONTENT_TYPE)
            .map_err(|e| ImportError::Internal(e.to_string()))?;

        let form = Form::new()
            .text("title", title.to_string())
            .text("destination_id", destination_id.to_string())
            .text("options", serde_json::to_string(options)?)
            .part("bundle", bundle);

        debug!("Submitting import job '{}' to {}", title, url);
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ImportError::Engine(format!("Failed to reach import engine: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Import engine refused job '{}': {} {}", title, status, body);
            return Err(ImportError::Engine(format!(
                "Import engine returned status {}",
                status
            )));
        }

        let reply: SubmitJobResponse = response.json().await.map_err(|e| {
            ImportError::Engine(format!("Failed to parse import engine response: {}", e))
        })?;

        Ok(ImportJobHandle {
            job_id: reply.job_id,
            accepted_at: reply.accepted_at.unwrap_or_else(Utc::now),
        })
    }
}
