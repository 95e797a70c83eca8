// Tokyo Map Agent - HTTP server entry point

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use tokyo_map_agent::services::ConfigService;
use tokyo_map_agent::{router, AppState, SettingsUpdate};

#[derive(Parser)]
#[command(name = "tokyo-map-agent")]
#[command(version)]
#[command(about = "Natural-language map search and trip planning for Tokyo")]
struct Cli {
    /// TOML configuration file
    #[arg(long, env = "TOKYO_MAP_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, overrides the config file
    #[arg(long, env = "TOKYO_MAP_BIND")]
    bind: Option<String>,

    /// Category/brand taxonomy YAML, overrides the config file
    #[arg(long, env = "TAXONOMY_PATH")]
    taxonomy: Option<PathBuf>,

    /// Model driving tool selection, overrides the config file
    #[arg(long, env = "OPENAI_MODEL")]
    model: Option<String>,

    /// Model for judging and summaries, overrides the config file
    #[arg(long, env = "VALIDATION_MODEL")]
    validation_model: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tokyo_map_agent=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config_service = ConfigService::load(cli.config.as_deref())?;
    let config = config_service.apply_overrides(SettingsUpdate {
        bind_addr: cli.bind,
        taxonomy_path: cli.taxonomy,
        model: cli.model,
        validation_model: cli.validation_model,
    })?;

    let api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty());
    if api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY is not set; model calls will fail");
    }

    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::from_config(config, api_key)?);
    let app = router(state);

    let listener = TcpListener::bind(bind_addr.as_str())
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Tokyo map agent listening on {}", bind_addr);
    axum::serve(listener, app.into_make_service())
        .await
        .context("server error")?;

    Ok(())
}
