//! Case Control Daemon
//!
//! Animates the case lighting and the character LCD and keeps the
//! controller board in sync over its serial link.

mod config;
mod console;
mod modes;
mod scheduler;
mod sensors;
mod standings;
mod state;
mod sync;
mod throttle;

use anyhow::{Context, Result};
use casecontrol_hw::SerialConnector;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::Config;
use modes::LcdSources;
use scheduler::{scheduler_loop, ModeRunner};
use sensors::{TempsSource, TextFeed};
use standings::{standings_loop, StandingsBoard};
use state::SharedState;
use sync::{sync_loop, SyncTiming, Synchronizer};

/// Longest wait for the lights-off packets at shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // Setup logging; stdout is reserved for console replies
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/default.toml".to_string());

    let config = Config::load_or_default(&config_path).context("Failed to load configuration")?;
    info!("Loaded configuration from: {}", config_path);

    // Initialize shared state from the last session
    let state = Arc::new(SharedState::load(&config.state_file));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Start tick scheduler
    let board = StandingsBoard::new();
    let sources = LcdSources {
        temps: TempsSource::new(
            &config.sensors.temps_log,
            Duration::from_millis(config.sensors.sample_interval),
        ),
        text: TextFeed::new(&config.text.path),
        standings: board.clone(),
    };
    let runner = ModeRunner::new(&state, sources);
    let scheduler = tokio::spawn(scheduler_loop(
        state.clone(),
        runner,
        config.tick_interval(),
        shutdown_rx.clone(),
    ));

    // Start serial synchronizer
    let connector = SerialConnector::new(&config.serial.port, config.serial.baud);
    let synchronizer = Synchronizer::new(connector, SyncTiming::from(&config.serial));
    let sync = tokio::spawn(sync_loop(synchronizer, state.clone(), shutdown_rx.clone()));

    // Start standings updates
    let standings = tokio::spawn(standings_loop(
        config.standings.clone(),
        state.clone(),
        board,
        shutdown_rx.clone(),
    ));

    // Setup Unix signal handlers
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;

    let console = async {
        if config.console {
            console::console_loop(state.clone()).await;
        } else {
            std::future::pending::<()>().await;
        }
    };

    // Wait for shutdown signal
    tokio::select! {
        _ = console => {
            info!("Shutdown requested from console");
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down");
        }
    }

    let _ = shutdown_tx.send(true);
    match tokio::time::timeout(SHUTDOWN_GRACE, sync).await {
        Ok(Err(e)) => warn!("Synchronizer task failed: {}", e),
        Err(_) => warn!("Controller did not answer before shutdown"),
        Ok(Ok(())) => {}
    }
    if let Err(e) = scheduler.await {
        warn!("Scheduler task failed: {}", e);
    }
    // Drops any fetch in flight
    standings.abort();

    state.save();
    info!("Settings saved, exiting");
    Ok(())
}
