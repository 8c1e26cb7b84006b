use anyhow::Context;
use estate_showcase::backends::Backends;
use estate_showcase::{router, AppState, Config};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("🏠 Estate Showcase");
    info!("==================");

    let config = Config::from_env().context("Failed to load configuration")?;
    let backends = Backends::from_config(&config).context("Failed to set up backends")?;
    let state = AppState::from_config(&config, backends);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("🚀 Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .await
        .context("Server stopped unexpectedly")?;

    Ok(())
}
