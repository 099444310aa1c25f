//! Import orchestration services

mod eligibility;
mod orchestrator;
mod upload;

#[cfg(test)]
pub(crate) mod testing;

pub use eligibility::EligibilityFilter;
pub use orchestrator::{ImportOrchestrator, SessionInfo, UploadReceipt};
pub use upload::{CaptureError, PendingUpload, UploadCapture};

use axum::http::StatusCode;
use siteport_core::problemdetails::{self, Problem};
use thiserror::Error;

/// Import service errors
#[derive(Error, Debug)]
pub enum ImportServiceError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Upload rejected: {0}")]
    Capture(#[from] CaptureError),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type for import services
pub type ImportServiceResult<T> = Result<T, ImportServiceError>;

impl From<ImportServiceError> for Problem {
    fn from(error: ImportServiceError) -> Self {
        match error {
            ImportServiceError::SessionNotFound(id) => problemdetails::new(StatusCode::NOT_FOUND)
                .with_title("Session Not Found")
                .with_detail(format!("Import session {} does not exist", id)),
            ImportServiceError::Capture(CaptureError::SizeExceeded { limit }) => {
                problemdetails::new(StatusCode::PAYLOAD_TOO_LARGE)
                    .with_title("Upload Too Large")
                    .with_detail(format!("The upload exceeds the limit of {} bytes", limit))
                    .with_value("limit", limit)
            }
            ImportServiceError::Capture(_) => problemdetails::new(StatusCode::BAD_REQUEST)
                .with_title("Upload Failed")
                .with_detail("The upload could not be received completely"),
            ImportServiceError::Validation(msg) => problemdetails::new(StatusCode::BAD_REQUEST)
                .with_title("Validation Error")
                .with_detail(msg),
        }
    }
}
