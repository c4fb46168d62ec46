use anyhow::{Context, Result};
use std::sync::Arc;
use tether::api::{create_connection_router, ConnectionAppState};
use tether::config::{self, TetherConfig};
use tether::coordinator::AuthCoordinator;
use tether::credentials::CredentialStore;
use tether::host::{self, InProcessHost};
use tether::provider::TwitterProvider;
use tether::session::{run_session_sweeper, SessionCache};
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tether=info".into()),
        )
        .init();

    info!("Tether starting...");

    let config = TetherConfig::load()?;

    let master_key = config::master_key_from_env()?;
    let store = Arc::new(CredentialStore::new(&config.storage.db_path, &master_key)?);
    info!(db_path = %config.storage.db_path, "credential store opened");

    let sessions = SessionCache::new(config.session.ttl_seconds, config.session.capacity);
    tokio::spawn(run_session_sweeper(
        sessions.clone(),
        config.session.sweep_interval_seconds,
    ));

    let in_process = Arc::new(InProcessHost::new());
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    tokio::spawn(host::run_event_loop(events_rx, in_process.clone()));

    let mut coordinator = AuthCoordinator::new(
        store,
        sessions,
        in_process.clone(),
        in_process,
        events_tx,
        config.api.callback_base_url.clone(),
    );

    match config::twitter_app_credentials() {
        Some(app) => {
            coordinator.register_provider(Arc::new(TwitterProvider::new(app)));
            info!("twitter oauth provider registered");
        }
        None => {
            warn!(
                "twitter oauth not configured; set TETHER_TWITTER_API_KEY and \
                 TETHER_TWITTER_API_SECRET_KEY to enable it"
            );
        }
    }

    let app = create_connection_router(ConnectionAppState {
        coordinator: Arc::new(coordinator),
    })
    .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&config.api.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.api.bind_addr))?;
    info!(addr = %config.api.bind_addr, "connection api listening");

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
