//! afa-analyzer - Audio Forensic Analysis service
//!
//! Accepts audio uploads over HTTP, runs the forensic extractors and returns
//! a structured report with a risk verdict.

use std::path::PathBuf;

use afa_common::config::{resolve_config_path, AnalysisConfig};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use afa_analyzer::capabilities::{self, Capabilities};
use afa_analyzer::AppState;

/// Command-line arguments
#[derive(Debug, Parser)]
#[command(name = "afa-analyzer", version, about = "Audio forensic analysis service")]
struct Args {
    /// Path to TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Step 1: Resolve and load configuration
    let config_path = resolve_config_path(args.config.as_deref());
    let mut config = AnalysisConfig::load(config_path.as_deref())
        .context("Failed to load configuration")?;
    config.apply_env_overrides();
    config.validate().context("Invalid configuration")?;

    // Step 2: Initialize tracing (RUST_LOG wins over the config level)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting afa-analyzer (Audio Forensic Analysis)");
    info!("Version: {}", afa_analyzer::analyzer_version());
    info!(
        "Build: {} ({})",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &config_path {
        Some(path) => info!("Config: {}", path.display()),
        None => info!("Config: compiled defaults"),
    }

    // Step 3: Prepare scratch root
    std::fs::create_dir_all(&config.scratch.root).with_context(|| {
        format!(
            "Failed to create scratch root {}",
            config.scratch.root.display()
        )
    })?;
    info!("Scratch root: {}", config.scratch.root.display());

    // Step 4: Install external capabilities once
    let capabilities = capabilities::install(Capabilities::from_config(&config.capabilities)?)?;

    // Step 5: Build router and serve
    let bind_address = config.server.bind_address.clone();
    let state = AppState::new(config, capabilities);
    let app = afa_analyzer::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    info!("Listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
