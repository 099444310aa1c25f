//! One-shot import of a local bundle file

use anyhow::Context;
use clap::Args;
use colored::Colorize;
use siteport_blob::{guess_content_type, OCTET_STREAM};
use siteport_import_types::ImportOutcome;
use std::path::PathBuf;
use tracing::debug;

use super::settings::ImportArgs;

/// Import a local bundle into a draft site
#[derive(Args)]
pub struct ImportCommand {
    /// Bundle file to import
    #[arg(long, short = 'f')]
    pub file: PathBuf,

    /// Destination to import into
    #[arg(long, short = 'd')]
    pub destination: String,

    #[command(flatten)]
    pub import: ImportArgs,
}

impl ImportCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let settings = self.import.settings()?;
        let orchestrator = self.import.build_orchestrator(&settings)?;

        let filename = self
            .file
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let content_type = guess_content_type(&filename).unwrap_or(OCTET_STREAM);

        let rt = tokio::runtime::Runtime::new()?;
        let outcome = rt.block_on(async {
            let file = tokio::fs::File::open(&self.file)
                .await
                .with_context(|| format!("Failed to open {}", self.file.display()))?;
            let len = file.metadata().await?.len();
            debug!("Importing {} ({} bytes)", self.file.display(), len);

            let session = orchestrator.open_session().await;
            let result = async {
                orchestrator
                    .capture_upload(&session.session_id, &filename, content_type, file, Some(len))
                    .await?;
                orchestrator
                    .run_import(&session.session_id, Some(&self.destination))
                    .await
            }
            .await;
            orchestrator.dispose(&session.session_id).await;

            result.context("Import could not be attempted")
        })?;

        match &outcome {
            ImportOutcome::Succeeded { job_id } => {
                println!("{} {}", "✓".bright_green(), outcome.message());
                println!("  Job: {}", job_id.bright_cyan());
                Ok(())
            }
            _ => {
                println!("{} {}", "✗".bright_red(), outcome.message());
                Err(anyhow::anyhow!("Import did not complete: {}", outcome.message()))
            }
        }
    }
}
