use std::sync::Arc;

use anyhow::Context;
use image_captioner::{server, Config, GeminiClient, Orchestrator};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();

    let config = Config::from_env().context("failed to load configuration")?;
    let client = GeminiClient::new(&config).context("failed to build HTTP client")?;
    let orchestrator = Orchestrator::new(Arc::new(client));

    let app = server::router(orchestrator, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    info!(model = %config.model, "Server running on http://{}", config.bind_addr);
    info!("Open in your browser to start captioning");

    axum::serve(listener, app).await?;
    Ok(())
}
