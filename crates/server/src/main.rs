//! podium server binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use podium_core::config::AppConfig;
use podium_server::bootstrap::ensure_admin_token;
use podium_server::{AppState, create_router};
use std::net::SocketAddr;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// podium - conference content API
#[derive(Parser, Debug)]
#[command(name = "podiumd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "PODIUM_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

/// Load configuration from an optional TOML file overlaid with `PODIUM_*`
/// environment variables (`__` separates nested keys).
fn load_config(path: &str) -> Result<AppConfig> {
    let has_config_file = Path::new(path).exists();
    let mut figment = Figment::new();

    if has_config_file {
        tracing::info!(config_path = %path, "Loading configuration from file");
        figment = figment.merge(Toml::file(path));
    } else {
        tracing::debug!("No config file found at {}", path);
    }

    let has_env_config =
        std::env::vars().any(|(key, _)| key.starts_with("PODIUM_") && key != "PODIUM_CONFIG");

    if !has_config_file && !has_env_config {
        anyhow::bail!(
            "No configuration provided.\n\n\
             Provide configuration via one of:\n  \
             1. Config file: podiumd --config /path/to/config.toml\n  \
             2. Environment variables: PODIUM_SERVER__BIND=0.0.0.0:8080 \
             PODIUM_ADMIN__TOKEN_HASH=sha256:YOUR_TOKEN_HASH_HERE podiumd"
        );
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("PODIUM_").split("__"))
        .extract()
        .context("failed to load configuration")?;
    config.validate()?;

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("podium v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;

    podium_server::metrics::register_metrics();
    tracing::info!("Prometheus metrics registered");

    let metadata = podium_metadata::from_config(&config.metadata)
        .await
        .context("failed to initialize metadata store")?;
    tracing::info!("Metadata store initialized");

    ensure_admin_token(metadata.as_ref(), &config.admin).await?;

    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;
    let state = AppState::new(config, metadata);
    let app = create_router(state);

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
