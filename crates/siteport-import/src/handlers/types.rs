//! Request and response types for import handlers

use serde::{Deserialize, Serialize};
use siteport_import_types::{Destination, ImportOutcome};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::services::ImportOrchestrator;

/// Application state for handlers
pub struct AppState {
    pub import_orchestrator: Arc<ImportOrchestrator>,
}

/// Whether the session can upload at all
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadEnabledResponse {
    /// True when at least one destination is eligible
    pub upload_enabled: bool,
}

/// Destinations that may receive an import
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DestinationsResponse {
    pub destinations: Vec<Destination>,
}

/// Destination picked by the user, as a number or as the text of a form field
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum DestinationSelection {
    Id(i64),
    Text(String),
}

impl DestinationSelection {
    pub fn as_text(&self) -> String {
        match self {
            DestinationSelection::Id(id) => id.to_string(),
            DestinationSelection::Text(text) => text.clone(),
        }
    }
}

/// Request to run the import for the session's pending upload
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct RunImportRequest {
    /// Destination to import into; blank or missing is rejected
    #[serde(default)]
    pub destination_id: Option<DestinationSelection>,
}

/// Result of an import attempt
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RunImportResponse {
    pub outcome: ImportOutcome,
    /// Message to show the user
    pub message: String,
}

impl From<ImportOutcome> for RunImportResponse {
    fn from(outcome: ImportOutcome) -> Self {
        Self {
            message: outcome.message().to_string(),
            outcome,
        }
    }
}
