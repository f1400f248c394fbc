use std::env;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tutor_llm::OpenAiChatClient;
use tutorium_server::api::{self, AppState};
use tutorium_server::config::ServerConfig;
use tutorium_server::db;

const CONFIG_PATH: &str = "tutorium.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    info!("starting tutorium server");

    let config = if Path::new(CONFIG_PATH).exists() {
        info!("loading server config from {CONFIG_PATH}");
        ServerConfig::from_file(CONFIG_PATH)
            .with_context(|| format!("failed to load server config from {CONFIG_PATH}"))?
    } else {
        info!("{CONFIG_PATH} not found, using defaults");
        ServerConfig::default()
    };

    let database_url = env::var("DATABASE_URL")
        .ok()
        .or_else(|| config.database_url.clone())
        .context("DATABASE_URL is not set and tutorium.toml has no database_url")?;

    let database = db::init_pool_and_migrate(&database_url)
        .await
        .context("failed to connect to the database and run migrations")?;
    info!("database connected and migrated");

    let provider = Arc::new(OpenAiChatClient::new(config.llm_base_url.clone()));
    let state = Arc::new(AppState::new(database, provider));
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "server is ready, press Ctrl+C to shut down");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received, stopping server");
}

fn init_tracing() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    Ok(())
}
