use anyhow::Result;
use page_visits::{ServerConfig, WebServer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::load()?;
    let server = WebServer::new(&config)?;

    info!("Starting the server...");
    server.start(config.http).await
}
