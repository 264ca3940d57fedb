//! tunnelgate daemon
//!
//! Hydrates the tenant registry from disk, runs the daily quota reset and
//! serves the admin gateway until shutdown.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tg_core::config::{ConfigSource, GatewayConfig};
use tg_server::quota::run_quota_reset;
use tg_server::server::AdminServer;
use tg_server::store::DiskStore;
use tg_server::GatewayState;

#[derive(Parser)]
#[command(name = "tunnelgate")]
#[command(about = "Tenant registry and login authorization for a reverse-tunnel server")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Admin gateway bind address (overrides config)
    #[arg(short, long)]
    bind: Option<String>,

    /// Directory holding account records (overrides config)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Shared secret for the admin gateway (overrides config)
    #[arg(long, env = "TUNNELGATE_ADMIN_SECRET", hide_env_values = true)]
    admin_secret: Option<String>,

    /// Run in foreground with verbose output
    #[arg(short, long)]
    foreground: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.foreground { "debug" } else { &args.log_level };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("tunnelgate starting...");

    let (mut config, source) = GatewayConfig::load_or_default(args.config.as_deref())
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;
    match source {
        ConfigSource::File(path) => tracing::info!("Loaded configuration from {:?}", path),
        ConfigSource::Defaults(None) => tracing::info!("Using default configuration"),
        ConfigSource::Defaults(Some((path, reason))) => {
            tracing::warn!("Failed to load config from {:?}: {}", path, reason);
        }
    }

    if let Some(bind) = args.bind {
        config.admin_bind_address = bind;
    }
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(secret) = args.admin_secret {
        config.admin_secret = Some(secret);
    }

    if config.admin_secret().is_none() {
        tracing::warn!("No admin secret configured - all admin requests will be rejected");
    }

    let store = Arc::new(DiskStore::new(&config.data_dir));
    tracing::info!("Account store at {:?}", store.root());

    let state = Arc::new(GatewayState::new(config.clone(), store));
    state
        .registry
        .hydrate()
        .await
        .context("Failed to load tenant accounts")?;

    let cancel = CancellationToken::new();

    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        cancel_clone.cancel();
    });

    let quota_task = tokio::spawn(run_quota_reset(
        Arc::clone(&state.registry),
        config.quota.reset_interval,
        cancel.clone(),
    ));

    let server = AdminServer::new(Arc::clone(&state), cancel.clone());
    let result = server.run(&config.admin_bind_address).await;

    cancel.cancel();
    if let Err(e) = quota_task.await {
        tracing::warn!("Quota reset task ended abnormally: {}", e);
    }

    result?;
    tracing::info!("tunnelgate shutdown complete");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn wait_for_shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
