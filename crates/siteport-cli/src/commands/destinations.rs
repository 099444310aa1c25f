use clap::Args;
use colored::Colorize;

use super::settings::ImportArgs;

/// List destinations that can currently receive an import
#[derive(Args)]
pub struct DestinationsCommand {
    #[command(flatten)]
    pub import: ImportArgs,
}

impl DestinationsCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let settings = self.import.settings()?;
        let orchestrator = self.import.build_orchestrator(&settings)?;

        let rt = tokio::runtime::Runtime::new()?;
        let destinations = rt.block_on(async {
            let session = orchestrator.open_session().await;
            let destinations = orchestrator
                .list_eligible_destinations(&session.session_id)
                .await;
            orchestrator.dispose(&session.session_id).await;
            destinations
        })?;

        if destinations.is_empty() {
            println!("{}", "No draft sites available for import".yellow());
            return Ok(());
        }

        println!("{}", "Draft sites available for import:".bright_white());
        for destination in destinations {
            println!(
                "  {} {}",
                destination.id.to_string().bright_cyan(),
                destination.display_name
            );
        }
        Ok(())
    }
}
