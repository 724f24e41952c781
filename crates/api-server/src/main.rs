//! API Server Binary Entry Point

use anyhow::Context;
use drone_locate_api_server::config::{default_config_path, gemini_api_key, load_config};
use drone_locate_api_server::{start_server, ApiState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pick up GEMINI_API_KEY and friends from a local .env when present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "drone_locate_api_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = default_config_path();
    let mut config = load_config(&config_path)?;
    config.apply_env_overrides(|key| std::env::var(key).ok());
    tracing::info!(
        "Configuration: addr={}, uploads={}, table={}, model={}",
        config.server.addr,
        config.server.upload_dir.display(),
        config.storage.csv_path.display(),
        config.gemini.model
    );

    let api_key = gemini_api_key()?;
    let addr = config.server.addr.clone();
    let state = ApiState::from_config(config, api_key)?;

    tracing::info!("Starting Drone Location API Server");
    start_server(&addr, state)
        .await
        .with_context(|| format!("Server on {addr} failed"))?;

    Ok(())
}
