//! siteport-blob: temporary artifact storage for Siteport
//!
//! Provides a filesystem-backed `TempArtifactStore` with per-destination isolation
//! and the content-type guessing used when staging uploads.

pub mod error;
pub mod services;

pub use error::BlobError;
pub use services::{guess_content_type, LocalArtifactStore, OCTET_STREAM};
