//! Squad Choice Back binary entrypoint wiring the REST API, the session store and background jobs.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use squad_choice_back::{
    config::{AppConfig, StoreBackend},
    dao::session_store::MemorySessionStore,
    routes,
    services::{retention, search_service::DisabledSearch},
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let sweep_interval = config.sweep_interval();
    let app_state = AppState::new(config, Arc::new(DisabledSearch));

    start_session_store(app_state.clone(), StoreBackend::from_env()).await;

    if let Some(period) = sweep_interval {
        info!(period_secs = period.as_secs(), "starting retention sweeper");
        tokio::spawn(retention::run(app_state.clone(), period));
    }

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

/// Install the in-memory store directly, or hand the database backends to the storage supervisor
/// which keeps the API degraded until they answer.
async fn start_session_store(state: SharedState, backend: StoreBackend) {
    match backend {
        StoreBackend::Memory => {
            info!("using in-memory session store; sessions will not survive a restart");
            state
                .set_session_store(Arc::new(MemorySessionStore::new()))
                .await;
        }
        #[cfg(feature = "couch-store")]
        StoreBackend::Couch => {
            use squad_choice_back::dao::{
                session_store::{
                    SessionStore,
                    couchdb::{CouchConfig, CouchSessionStore},
                },
                storage::StorageError,
            };
            use squad_choice_back::services::storage_supervisor;

            tokio::spawn(storage_supervisor::run(state, || async {
                let config = CouchConfig::from_env()?;
                let store = CouchSessionStore::connect(config).await?;
                Ok::<Arc<dyn SessionStore>, StorageError>(Arc::new(store))
            }));
        }
        #[cfg(feature = "mongo-store")]
        StoreBackend::Mongo => {
            use squad_choice_back::dao::{
                session_store::{
                    SessionStore,
                    mongodb::{MongoConfig, MongoSessionStore},
                },
                storage::StorageError,
            };
            use squad_choice_back::services::storage_supervisor;

            tokio::spawn(storage_supervisor::run(state, || async {
                let config = MongoConfig::from_env().await?;
                let store = MongoSessionStore::connect(config).await?;
                Ok::<Arc<dyn SessionStore>, StorageError>(Arc::new(store))
            }));
        }
        #[allow(unreachable_patterns)]
        other => {
            warn!(backend = ?other, "backend not compiled in; using in-memory session store");
            state
                .set_session_store(Arc::new(MemorySessionStore::new()))
                .await;
        }
    }
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
                warn!(error = %err, "cannot install SIGTERM handler; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
