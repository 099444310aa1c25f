//! Siteport Import Orchestrator
//!
//! This crate provides the HTTP API and orchestration layer for importing site
//! bundles into draft destinations.
//!
//! # Architecture
//!
//! - **Handlers**: HTTP endpoints for import sessions
//! - **Services**: Upload capture, eligibility filtering and the import workflow
//! - **Clients**: Catalog-backed destination directory and HTTP import engine
//!
//! # Usage
//!
//! Build an [`ImportOrchestrator`] from [`siteport_core::ImportSettings`] and the three
//! collaborators, wrap it in [`handlers::types::AppState`] and mount
//! [`handlers::configure_routes`].

pub mod clients;
pub mod handlers;
pub mod services;

pub use clients::{CatalogDirectory, HttpImportEngine};
pub use handlers::{configure_routes, ImportApiDoc};
pub use services::{ImportOrchestrator, ImportServiceError, ImportServiceResult};
