//! Outcome of an import attempt
//!
//! Callers never see collaborator errors; every attempt ends in exactly one of
//! these outcomes, each with a message fit for the user.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

pub const SUCCESS_MESSAGE: &str = "Your request completed successfully.";
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred.";

/// User-correctable reasons an import was not attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    NoDestinationSelected,
    NoUploadPresent,
}

impl RejectionReason {
    pub fn message(&self) -> &'static str {
        match self {
            RejectionReason::NoDestinationSelected => "No site selected",
            RejectionReason::NoUploadPresent => "No file uploaded",
        }
    }
}

/// Reasons an attempted import did not reach the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    StagingFailed,
    SubmissionFailed,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::StagingFailed => f.write_str("staging failed"),
            FailureReason::SubmissionFailed => f.write_str("submission failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImportOutcome {
    /// The engine accepted the job
    Succeeded { job_id: String },
    /// Validation stopped the attempt before any staging
    Rejected { reason: RejectionReason },
    /// Staging or submission failed; cleanup has already run
    Failed { reason: FailureReason },
}

impl ImportOutcome {
    pub fn rejected(reason: RejectionReason) -> Self {
        ImportOutcome::Rejected { reason }
    }

    pub fn failed(reason: FailureReason) -> Self {
        ImportOutcome::Failed { reason }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ImportOutcome::Succeeded { .. })
    }

    /// Message for the user. Failures are generic and never carry internal detail.
    pub fn message(&self) -> &'static str {
        match self {
            ImportOutcome::Succeeded { .. } => SUCCESS_MESSAGE,
            ImportOutcome::Rejected { reason } => reason.message(),
            ImportOutcome::Failed { .. } => UNEXPECTED_ERROR_MESSAGE,
        }
    }
}
