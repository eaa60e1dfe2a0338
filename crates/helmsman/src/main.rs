//! # Helmsman - Armada Fleet Engine
//!
//! The brain of Armada. Manages a fleet of network appliances through their
//! remote management APIs: cluster-wide operation dispatch, encrypted
//! credential storage, node registry, and periodic health probing.
//!
//! ## Architecture
//! ```text
//! API/UI → Helmsman → Appliance management APIs
//!              ↓
//!           Redis (Registry)
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod adapter;
mod audit;
mod config;
mod dispatch;
mod prober;
mod registry;
mod routes;
mod state;
mod vault;

use config::AppConfig;
use prober::prober_worker;
use state::AppState;
use vault::CredentialVault;

/// Armada Helmsman - Fleet Engine
#[derive(Parser, Debug)]
#[command(name = "helmsman")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/helmsman.toml")]
    config: String,

    /// Redis URL (overrides config)
    #[arg(long, env = "REDIS_URL")]
    redis_url: Option<String>,

    /// Listen address (overrides config)
    #[arg(short, long, env = "LISTEN_ADDR")]
    listen: Option<String>,

    /// Run without Redis (in-memory node registry)
    #[arg(long, default_value = "false")]
    standalone: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, default_value = "false")]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before anything reads the vault key
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level, args.json_logs)?;

    info!("⚓ Starting Armada Helmsman v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::load(&args.config, &args)?;
    info!("📋 Configuration loaded from {}", args.config);

    // The vault key is a hard startup requirement: refusing to start beats
    // silently operating on plaintext credentials.
    let vault = CredentialVault::from_env().context("Vault key misconfigured")?;
    info!("🔐 Credential vault initialized");

    // Create shutdown broadcast channel
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    // Initialize application state
    let state = AppState::new(config.clone(), vault).await?;
    if !config.standalone {
        info!("✅ Redis connected: {}", config.redis_url);
    }

    // Spawn the health prober
    let prober = Arc::clone(&state.prober);
    let probe_interval = config.probe.interval_secs;
    let prober_shutdown = shutdown_tx.subscribe();
    tokio::spawn(async move {
        prober_worker(prober, probe_interval, prober_shutdown).await;
    });

    // Build router
    let app = routes::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!("🚀 Helmsman listening on {}", config.listen_addr);

    // Handle graceful shutdown
    let shutdown_signal = async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("🛑 Shutdown signal received");
        let _ = shutdown_tx.send(());
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("Server error")?;

    info!("👋 Helmsman shutdown complete");
    Ok(())
}

/// Initialize structured logging with tracing
fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .init();
    }

    Ok(())
}
