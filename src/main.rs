use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use huntboard_interview::{create_router, AppConfig, AppState, NatsStore};
use tracing::info;

/// Mock-interview recording session service
#[derive(Debug, Parser)]
#[command(name = "huntboard-interview", version)]
struct Cli {
    /// Path to the configuration file (without extension)
    #[arg(long, default_value = "config/huntboard-interview")]
    config: String,

    /// Override the configured HTTP port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = AppConfig::load(&cli.config)
        .with_context(|| format!("failed to load config '{}'", cli.config))?;

    info!("{} starting", cfg.service.name);
    info!(
        "Capture: {:?} ({}Hz/{}ch), recognition: {} ({}), store: {}",
        cfg.capture.kind,
        cfg.capture.sample_rate,
        cfg.capture.channels,
        if cfg.recognition.enabled { "enabled" } else { "disabled" },
        cfg.recognition.language,
        cfg.store.url
    );

    let store = Arc::new(
        NatsStore::connect(&cfg.store.url)
            .await
            .context("failed to connect to the interview store")?,
    );

    let state = AppState::new(cfg.capture.clone(), cfg.recognition.clone(), store);
    let app = create_router(state);

    let port = cli.port.unwrap_or(cfg.service.http.port);
    let addr = format!("{}:{}", cfg.service.http.bind, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("HTTP control surface listening on {}", addr);
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
