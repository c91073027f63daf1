//! # WebShield Server
//!
//! Web front end for external security scanners (nmap, nikto, wapiti,
//! ffuf). Scans run as supervised child processes; clients poll their
//! output and download reports over a small JSON API.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use webshield_config::{ConfigLoad, ConfigLoader, ConfigLoaderOptions};
use webshield_core::tools::{log_tool_availability, probe_tools};
use webshield_server::{
    AppState,
    infra::{app::create_app, shutdown::shutdown_signal},
};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "webshield-server")]
#[command(about = "Web front end for running and monitoring security scans")]
struct Cli {
    /// Path to a webshield.toml configuration file
    #[arg(short, long, env = "WEBSHIELD_CONFIG")]
    config: Option<PathBuf>,

    /// Path to a .env file (defaults to ./.env when present)
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Server port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Server host (overrides config)
    #[arg(long)]
    host: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let ConfigLoad {
        mut config,
        warnings,
    } = ConfigLoader::with_options(ConfigLoaderOptions {
        config_path: cli.config.clone(),
        env_file: cli.env_file.clone(),
    })
    .load()
    .context("failed to load configuration")?;

    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(host) = cli.host.clone() {
        config.server.host = host;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    // Override via RUST_LOG.
                    "info,tower_http=warn".into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if config.metadata.env_file_loaded {
        info!("loaded .env file");
    }
    if let Some(path) = config.metadata.config_path.as_ref() {
        info!(path = %path.display(), "configuration file loaded");
    }

    for warning in &warnings.items {
        match &warning.hint {
            Some(hint) => {
                warn!(
                    message = %warning.message,
                    hint = %hint,
                    "configuration warning"
                )
            }
            None => {
                warn!(message = %warning.message, "configuration warning")
            }
        }
    }

    let tools = probe_tools(&config.scanner);
    log_tool_availability(&tools);

    let addr = config.server.bind_address();

    let state = AppState::new(config);
    let controller = state.controller().clone();
    let router = create_app(state);

    info!("Starting WebShield Scanner on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(controller))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}
