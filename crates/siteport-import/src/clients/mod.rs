//! Reference adapters for the destination directory and the import engine

mod catalog;
mod http_engine;

pub use catalog::{Catalog, CatalogDirectory};
pub use http_engine::{HttpImportEngine, SubmitJobResponse};
