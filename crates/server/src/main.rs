mod auth;
mod bootstrap;
mod chat;
mod dialogue;
mod health;
mod identity;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::Router;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use concierge_core::config::{AppConfig, LoadOptions};
use concierge_db::repositories::{
    SqlPreferenceRepository, SqlRequestQueue, SqlRestaurantRepository, SqlSearchIndexRepository,
    SqlTokenRepository,
};
use concierge_db::DbPool;
use concierge_dialogue::{DialogueFulfiller, HttpRecognizer};
use concierge_worker::{FulfillmentWorker, SmtpNotifier};

use crate::identity::HttpIdentityProvider;

fn init_logging(config: &AppConfig) {
    use concierge_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let router = build_router(&app.config, app.db_pool.clone())?;

    let notifier = SmtpNotifier::from_config(&app.config.smtp)?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut worker_handle =
        spawn_worker(app.config.clone(), app.db_pool.clone(), notifier, shutdown_rx);

    let bind = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(
        event_name = "system.server.started",
        bind_address = %bind,
        "concierge-server listening"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(wait_for_shutdown(shutdown_tx))
        .await?;

    // Give an in-flight drain the configured window to finish.
    let window = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    if tokio::time::timeout(window, &mut worker_handle).await.is_err() {
        tracing::warn!(
            event_name = "system.server.worker_aborted",
            "fulfillment worker did not stop within the shutdown window"
        );
        worker_handle.abort();
    }

    tracing::info!(event_name = "system.server.stopped", "concierge-server stopped");
    Ok(())
}

fn build_router(config: &AppConfig, db_pool: DbPool) -> Result<Router> {
    let recognizer = Arc::new(HttpRecognizer::from_config(&config.recognizer)?);
    let identity = Arc::new(HttpIdentityProvider::from_config(&config.identity)?);
    let tokens = Arc::new(SqlTokenRepository::new(db_pool.clone()));
    let fulfiller = Arc::new(DialogueFulfiller::new(
        SqlPreferenceRepository::new(db_pool.clone()),
        SqlRequestQueue::new(db_pool.clone(), config.worker.visibility_timeout_secs),
    ));

    Ok(Router::new()
        .merge(chat::router(recognizer))
        .merge(dialogue::router(fulfiller))
        .merge(auth::router(identity, tokens))
        .merge(health::router(db_pool)))
}

/// The queue poll trigger: one worker drain per interval tick until the
/// shutdown signal flips.
fn spawn_worker(
    config: AppConfig,
    db_pool: DbPool,
    notifier: SmtpNotifier,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let worker = FulfillmentWorker::new(
            SqlRequestQueue::new(db_pool.clone(), config.worker.visibility_timeout_secs),
            SqlSearchIndexRepository::new(db_pool.clone()),
            SqlRestaurantRepository::new(db_pool.clone()),
            SqlPreferenceRepository::new(db_pool),
            notifier,
            config.worker.batch_size,
            config.worker.candidate_count,
        );

        let mut ticker =
            tokio::time::interval(Duration::from_secs(config.worker.poll_interval_secs));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(error) = worker.drain().await {
                        tracing::error!(
                            event_name = "worker.drain_failed",
                            error = %error,
                            "queue drain failed; retrying next tick"
                        );
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
    })
}

async fn wait_for_shutdown(shutdown_tx: watch::Sender<bool>) {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(
            event_name = "system.server.signal_error",
            error = %error,
            "could not listen for shutdown signal"
        );
        return;
    }
    tracing::info!(event_name = "system.server.stopping", "shutdown signal received");
    let _ = shutdown_tx.send(true);
}
