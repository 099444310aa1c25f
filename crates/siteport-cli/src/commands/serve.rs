use axum::Router;
use clap::Args;
use siteport_import::handlers::types::AppState;
use siteport_import::{configure_routes, ImportApiDoc};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::settings::ImportArgs;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[derive(Args)]
pub struct ServeCommand {
    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1:3000", env = "SITEPORT_ADDRESS")]
    pub address: String,

    #[command(flatten)]
    pub import: ImportArgs,
}

impl ServeCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.run())
    }

    async fn run(self) -> anyhow::Result<()> {
        let settings = self.import.settings()?;
        let orchestrator = self.import.build_orchestrator(&settings)?;

        let state = Arc::new(AppState {
            import_orchestrator: orchestrator.clone(),
        });
        let app = Router::new()
            .merge(configure_routes(settings.max_upload_bytes).with_state(state))
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ImportApiDoc::openapi()))
            .layer(TraceLayer::new_for_http())
            .layer(CatchPanicLayer::new());

        let listener = TcpListener::bind(&self.address).await?;
        info!(
            "Siteport import API listening on {} (staging folder '{}', upload limit {} bytes)",
            self.address, settings.staging_folder, settings.max_upload_bytes
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Server stopped, releasing open sessions...");
        if tokio::time::timeout(SHUTDOWN_GRACE, orchestrator.shutdown())
            .await
            .is_err()
        {
            warn!(
                "Import attempts still running after {:?}, abandoning them",
                SHUTDOWN_GRACE
            );
        }
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C, shutting down");
}
