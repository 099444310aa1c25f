pub mod destinations;
pub mod import;
pub mod serve;
mod settings;

pub use destinations::DestinationsCommand;
pub use import::ImportCommand;
pub use serve::ServeCommand;
