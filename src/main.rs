//! Classpoll Back binary entrypoint wiring REST, WebSocket, SSE and poll storage layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use classpoll_back::{
    config::AppConfig,
    dao::poll_store::InMemoryPollStore,
    routes,
    services::storage_supervisor,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let app_state = AppState::new(AppConfig::load());
    tokio::spawn(storage_supervisor::announce_status_changes(
        app_state.clone(),
    ));
    start_poll_store(&app_state).await;

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state.clone());

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

    info!("flushing pending poll history writes");
    app_state.persistence().drain().await;
    Ok(())
}

/// Supervise MongoDB when `MONGO_URI` is set; otherwise keep history in memory.
#[cfg(feature = "mongo-store")]
async fn start_poll_store(state: &SharedState) {
    use classpoll_back::dao::{
        poll_store::{
            PollStore,
            mongodb::{MongoConfig, MongoPollStore},
        },
        storage::StorageError,
    };

    let Ok(uri) = env::var("MONGO_URI") else {
        install_memory_store(state).await;
        return;
    };
    let db_name = env::var("MONGO_DB").ok();

    tokio::spawn(storage_supervisor::run(state.clone(), move || {
        let uri = uri.clone();
        let db_name = db_name.clone();
        async move {
            let config = MongoConfig::from_uri(&uri, db_name.as_deref()).await?;
            let store = MongoPollStore::connect(config).await?;
            Ok::<Arc<dyn PollStore>, StorageError>(Arc::new(store))
        }
    }));
}

#[cfg(not(feature = "mongo-store"))]
async fn start_poll_store(state: &SharedState) {
    install_memory_store(state).await;
}

async fn install_memory_store(state: &SharedState) {
    warn!("MONGO_URI not set; poll history is kept in memory only");
    state
        .install_poll_store(Arc::new(InMemoryPollStore::new()))
        .await;
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

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
