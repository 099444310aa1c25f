//! Siteport CLI - Single entrypoint for the import service
//!
//! Serves the import HTTP API or runs a one-shot import of a local bundle.

mod commands;

use clap::{Parser, Subcommand};
use commands::{DestinationsCommand, ImportCommand, ServeCommand};
use tracing_subscriber::{layer::SubscriberExt, Layer};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "SITEPORT_LOG_LEVEL", global = true)]
    log_level: String,

    /// Log format: compact, full
    #[arg(
        long,
        default_value = "compact",
        env = "SITEPORT_LOG_FORMAT",
        global = true
    )]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the import HTTP API server
    Serve(ServeCommand),
    /// Import a local bundle into a destination
    Import(ImportCommand),
    /// List destinations that can receive an import
    Destinations(DestinationsCommand),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // If RUST_LOG is set, use it directly; otherwise use our default filter
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .map_err(|e| anyhow::anyhow!("Invalid RUST_LOG environment variable: {}", e))?
    } else {
        // All siteport crates at the requested level, noisy dependencies at warn
        tracing_subscriber::EnvFilter::new(format!(
            "siteport={level},\
             siteport_cli={level},\
             siteport_core={level},\
             siteport_import={level},\
             siteport_import_types={level},\
             siteport_blob={level},\
             h2=warn,\
             tower=warn,\
             tower_http=warn,\
             hyper=warn,\
             reqwest=warn",
            level = cli.log_level
        ))
    };

    let fmt_layer = match cli.log_format.as_str() {
        "full" => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed(),
        _ => tracing_subscriber::fmt::layer() // "compact" or any other value
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set global default subscriber: {}", e))?;

    match cli.command {
        Commands::Serve(serve_cmd) => serve_cmd.execute(),
        Commands::Import(import_cmd) => import_cmd.execute(),
        Commands::Destinations(destinations_cmd) => destinations_cmd.execute(),
    }
}
