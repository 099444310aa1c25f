//! Core utilities and types shared across all Siteport crates

pub mod config;
pub mod problemdetails;

pub use config::*;
pub use problemdetails::{Problem, ProblemDetails};

// Re-export external dependencies
pub use serde;
pub use serde_json;
pub use thiserror;
pub use tracing;
