//! Survival Games - authoritative battle-royale minigame server
//!
//! Runs the match cycle: waits for players, drives a live match through its
//! state machine, announces results and rolls over into the next match.

mod app;
mod config;
mod game;
mod host;
mod modules;
mod util;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::AppState;
use crate::config::Config;
use crate::game::GameCycle;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    info!("Starting Survival Games");
    info!("Assets directory: {}", config.assets_dir.display());

    // Seed the stock loot tables on first run
    game::loot::write_default_tables(&config.assets_dir)?;

    // Create application state
    let (state, events_rx) = AppState::new(config);

    // Spawn the match cycle
    let cycle = GameCycle::new(
        state.config.as_ref().clone(),
        state.sessions.clone(),
        state.services.clone(),
        events_rx,
        state.outbound.clone(),
    );
    let cycle_task = tokio::spawn(async move { cycle.run().await });

    shutdown_signal().await;

    // Dropping the event sender closes the queue and stops the cycle
    drop(state);
    cycle_task.await??;

    info!("Shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
