mod config;

use std::{net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use opsdash_contract::{
    BackupKind, CompressionType, CreateBackupRequest, SendMessageRequest, StorageProvider,
};
use opsdash_control_plane::{build_router, AppState};
use opsdash_lifecycle::{BackupEngine, LandingEngine, MessageEngine};
use opsdash_metrics::{backup_stats, landing_stats, message_stats};
use serde_json::json;
use tracing::{info, warn};

use crate::config::{RuntimeConfig, SeedFile};

/// Extra wait after the last scheduled stage before `simulate` gives up.
const SETTLE_MARGIN: Duration = Duration::from_millis(250);
const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Parser)]
#[command(author, version, about = "Operations dashboard lifecycle daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the dashboard API over HTTP.
    Serve {
        #[arg(long, default_value = "config/opsdash.toml")]
        config: PathBuf,
        /// JSON file with `backups`, `messages` and `landing_pages` arrays.
        #[arg(long)]
        seed: Option<PathBuf>,
    },
    /// Run one backup and one SMS through their lifecycle and print the stats.
    Simulate {
        #[arg(long, default_value = "config/opsdash.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve { config, seed } => serve(config, seed).await,
        Command::Simulate { config } => simulate(config).await,
    }
}

async fn serve(config_path: PathBuf, seed_path: Option<PathBuf>) -> Result<()> {
    let config = RuntimeConfig::load(&config_path)?;
    let seed = match &seed_path {
        Some(path) => SeedFile::load(path)?,
        None => SeedFile::default(),
    };
    info!(
        backups = seed.backups.len(),
        messages = seed.messages.len(),
        landing_pages = seed.landing_pages.len(),
        "seed loaded"
    );

    let state = AppState::new(
        BackupEngine::with_resources(config.backup_settings()?, seed.backups),
        MessageEngine::with_resources(config.message_settings()?, seed.messages),
        LandingEngine::with_resources((), seed.landing_pages),
    );

    let bind: SocketAddr = config
        .http
        .bind
        .parse()
        .map_err(|error| anyhow!("invalid http.bind '{}': {error}", config.http.bind))?;
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;

    info!(%bind, config = %config_path.display(), "opsdash control plane listening");
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("axum server failed")
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(%error, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

async fn simulate(config_path: PathBuf) -> Result<()> {
    let config = RuntimeConfig::load(&config_path)?;
    let backups = BackupEngine::new(config.backup_settings()?);
    let messages = MessageEngine::new(config.message_settings()?);
    let deadline = backups
        .settings()
        .completion_delay
        .max(messages.settings().delivered_after)
        + SETTLE_MARGIN;

    let _backup_watch = backups.subscribe(|collection| {
        for backup in collection.iter() {
            println!("backup {} {} {}", backup.backup_id, backup.status, backup.storage_location);
        }
    })?;
    let _message_watch = messages.subscribe(|collection| {
        for message in collection.iter() {
            println!("sms {} {} -> {}", message.message_id, message.send_status, message.to);
        }
    })?;

    backups.create(CreateBackupRequest {
        backup_type: Some(BackupKind::Full),
        storage_provider: Some(StorageProvider::Aws),
        compression_type: Some(CompressionType::Gzip),
        retention_days: None,
    })?;
    messages.create(SendMessageRequest {
        from: None,
        to: Some("+55 11 91234-5678".to_string()),
        body: Some("Lifecycle simulation".to_string()),
    })?;

    let settled = tokio::time::timeout(deadline, async {
        while !lifecycle_finished(&backups, &messages) {
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    })
    .await;
    if settled.is_err() {
        warn!(?deadline, "simulation did not settle before the deadline");
    }

    let report = json!({
        "backups": backup_stats(backups.snapshot().as_slice()),
        "sms": message_stats(messages.snapshot().as_slice()),
        "landing_pages": landing_stats(LandingEngine::new(()).snapshot().as_slice()),
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("failed to render stats")?
    );
    Ok(())
}

fn lifecycle_finished(backups: &BackupEngine, messages: &MessageEngine) -> bool {
    backups.snapshot().iter().all(|backup| backup.status.is_terminal())
        && messages
            .snapshot()
            .iter()
            .all(|message| message.send_status.is_terminal())
}
