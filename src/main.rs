mod config;
mod engine;
mod ledger;
mod monitor;
mod odds;
mod scheduler;

use anyhow::Result;
use config::{Config, EnvConfig};
use engine::{UciEngine, UciEngineConfig};
use ledger::{LedgerClient, OddsUpdater};
use monitor::GameMonitor;
use scheduler::GameScheduler;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    tracing::info!("🚀 Chess betting oracle starting...");

    // Load configuration
    tracing::info!("Loading configuration...");
    let config = Config::load("config.toml")?;
    let env_config = EnvConfig::load()?;

    tracing::info!("Configuration validated");
    tracing::info!("  Game app: {}", env_config.game_app_id);
    tracing::info!("  Betting app: {}", env_config.betting_app_id);
    tracing::info!("  Ledger service: {}", env_config.service_url);
    tracing::info!("  Polling interval: {}s", config.oracle.polling_interval_secs);
    tracing::info!("  Engine depth: {}", config.engine.depth);

    // Start the engine subprocess
    tracing::info!("Starting engine: {}", config.engine.command);
    let engine_config = UciEngineConfig {
        command: config.engine.command.clone(),
        args: config.engine.args.clone(),
        threads: config.engine.threads,
        hash_mb: config.engine.hash_mb,
        ready_timeout: Duration::from_secs(config.engine.ready_timeout_secs),
        search_timeout: Duration::from_secs(config.engine.search_timeout_secs),
    };
    let engine = Arc::new(UciEngine::start(&engine_config).await?);

    // Wire the monitor against the two ledger applications
    let game_ledger = Arc::new(LedgerClient::new(
        &env_config.service_url,
        &env_config.chain_id,
        &env_config.game_app_id,
    ));
    let odds_updater = Arc::new(OddsUpdater::new(
        &env_config.service_url,
        &env_config.chain_id,
        &env_config.betting_app_id,
    ));
    let monitor = Arc::new(GameMonitor::new(
        engine.clone(),
        game_ledger,
        odds_updater,
        config.engine.depth,
    ));

    // Prime once, then hand off to the periodic scheduler
    let mut scheduler = GameScheduler::new(
        monitor,
        Duration::from_secs(config.oracle.polling_interval_secs),
    );
    scheduler.run_once().await;
    scheduler.start();

    tracing::info!("✅ Oracle service running, press Ctrl+C to stop");

    wait_for_shutdown().await?;

    tracing::info!("Shutting down gracefully...");
    scheduler.stop();
    engine.stop().await;
    tracing::info!("Oracle service stopped");

    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        _ = sigterm.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
