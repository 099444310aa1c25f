//! Artifact store services

mod content_type;
mod local_store;

pub use content_type::{guess_content_type, OCTET_STREAM};
pub use local_store::LocalArtifactStore;
