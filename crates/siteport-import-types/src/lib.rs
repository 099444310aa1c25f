//! Core types and traits for the Siteport import workflow
//!
//! This crate provides the abstractions the import orchestrator consumes and the
//! values it hands back to callers.
//!
//! # Architecture
//!
//! - **Traits**: `TempArtifactStore`, `DestinationDirectory` and `ImportEngine` describe
//!   the external collaborators
//! - **Types**: `Destination`, `ContentState`, `ArtifactHandle`, `ImportOptions`,
//!   `ImportOutcome`
//! - **Errors**: `ImportError` for every collaborator failure
//!
//! # Usage
//!
//! Collaborator implementations (e.g., `siteport-blob`) depend on this crate and
//! implement the matching trait.

pub mod artifact;
pub mod destination;
pub mod engine;
pub mod error;
pub mod options;
pub mod outcome;

pub use artifact::{ArtifactHandle, ByteStream, TempArtifactStore};
pub use destination::{ContentState, Destination, DestinationDirectory, DestinationId, LifecycleStatus};
pub use engine::{ImportEngine, ImportJobHandle};
pub use error::{ImportError, ImportResult};
pub use options::ImportOptions;
pub use outcome::{FailureReason, ImportOutcome, RejectionReason};
