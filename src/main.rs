//! Forge Legion - bot core for a resource-and-construction strategy game
//!
//! Serves slash commands and interactive construction sessions to a chat
//! gateway adapter over HTTP.

mod api;
mod catalog;
mod commands;
mod config;
mod cooldown;
mod db;
mod ledger;
mod log_queue;
mod runtime;
mod state_machine;
mod view;

use api::{create_router, AppState};
use catalog::{Catalog, Emojis};
use commands::Commands;
use config::BotConfig;
use cooldown::{spawn_sweeper, Cooldowns};
use db::Database;
use log_queue::{LogQueue, LogQueueConfig, SinkLayer, WebhookSink};
use runtime::SessionManager;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = BotConfig::from_env();
    let shutdown = CancellationToken::new();

    // Batched webhook delivery, when configured
    let sink_layer = match &config.log_webhook {
        Some(url) => {
            let sink = WebhookSink::new(url.as_str())?;
            let queue = LogQueue::new(Arc::new(sink), LogQueueConfig::default(), shutdown.clone());
            Some(SinkLayer::new(queue))
        }
        None => None,
    };

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "forgelegion=info,tower_http=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .with(sink_layer)
        .init();

    // Ensure database directory exists
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Initialize database
    tracing::info!(path = %config.db_path.display(), "Opening database");
    let db = Database::open(&config.db_path)?;

    // Game data; missing files degrade to an empty catalog
    let catalog = Catalog::load_or_empty(&config.buildings_path());
    let emojis = Emojis::load_or_default(&config.emojis_path());

    let cooldowns = Arc::new(Cooldowns::default());
    let sweeper = spawn_sweeper(cooldowns.clone(), Duration::from_secs(60), shutdown.clone());

    let sessions = Arc::new(SessionManager::new(
        Arc::new(db),
        Arc::new(catalog),
        Arc::new(emojis),
    ));
    let state = AppState::new(Commands::new(sessions, cooldowns));

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Forge Legion listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            signal.cancel();
        })
        .await?;

    shutdown.cancel();
    let _ = sweeper.await;
    tracing::info!("Forge Legion stopped");

    Ok(())
}
