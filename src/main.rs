//! Deck Ban Back binary entrypoint wiring REST, SSE and game storage layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use deck_ban_back::{
    config::AppConfig,
    dao::game_store::{GameStore, memory::MemoryGameStore},
    routes,
    state::{AppState, SharedState},
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let app_state = install_store(config).await;

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Select the storage backend from `STORE_BACKEND` and install it.
///
/// The in-memory store is ready immediately. CouchDB is connected by the storage supervisor in
/// the background while the server starts in degraded mode.
async fn install_store(config: AppConfig) -> SharedState {
    let backend = env::var("STORE_BACKEND").unwrap_or_else(|_| "memory".into());
    match backend.as_str() {
        #[cfg(feature = "couch-store")]
        "couch" | "couchdb" => {
            let state = AppState::new(config);
            tokio::spawn(deck_ban_back::services::storage_supervisor::run(
                state.clone(),
                connect_couch,
            ));
            state
        }
        other => {
            if other != "memory" {
                warn!(backend = other, "unknown STORE_BACKEND; using in-memory store");
            }
            info!("using in-memory game store");
            let store: Arc<dyn GameStore> = Arc::new(MemoryGameStore::new());
            AppState::with_store(config, store).await
        }
    }
}

#[cfg(feature = "couch-store")]
async fn connect_couch()
-> Result<Arc<dyn GameStore>, deck_ban_back::dao::storage::StorageError> {
    use deck_ban_back::dao::game_store::couchdb::{CouchConfig, CouchGameStore};

    let config = CouchConfig::from_env()?;
    let store = CouchGameStore::connect(config).await?;
    Ok(Arc::new(store))
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
