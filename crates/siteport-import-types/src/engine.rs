//! Import engine trait
//!
//! The engine parses and applies a bundle out of band. Submission is one-shot: the
//! caller observes acceptance or an immediate error, never the import's progress.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::artifact::ByteStream;
use crate::destination::DestinationId;
use crate::error::ImportResult;
use crate::options::ImportOptions;

/// Acknowledgment that the engine accepted a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ImportJobHandle {
    /// Engine-assigned job identifier
    pub job_id: String,
    pub accepted_at: DateTime<Utc>,
}

impl ImportJobHandle {
    pub fn accepted(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            accepted_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait ImportEngine: Send + Sync {
    /// Hand a bundle to the engine for background import into `destination_id`
    async fn submit_import_job(
        &self,
        title: &str,
        destination_id: DestinationId,
        options: &ImportOptions,
        stream: ByteStream,
    ) -> ImportResult<ImportJobHandle>;
}
