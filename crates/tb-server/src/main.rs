//! Taskboard RS server binary
//!
//! Wires the Postgres store (or the in-memory fallback), the realtime
//! broadcaster, and the HTTP surface into one axum application.

use std::sync::Arc;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tb_api::AppState;
use tb_auth::JwtService;
use tb_core::config::AppConfig;
use tb_db::{Database, DatabaseConfig, PgWorkflowStore};
use tb_realtime::broadcast::Broadcaster;
use tb_realtime::registry::RoomRegistry;
use tb_workflow::{MemoryStore, WorkflowStore};

mod reporting;

use reporting::StoreReportingClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    dotenvy::dotenv().ok();
    let config = AppConfig::from_env();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.server.host,
        port = config.server.port,
        "Starting Taskboard RS"
    );

    let store: Arc<dyn WorkflowStore> = match connect_store(&config).await {
        Some(store) => store,
        None => {
            warn!("Running with the in-memory store; data will not survive restarts");
            Arc::new(MemoryStore::new())
        }
    };

    let registry = Arc::new(RoomRegistry::new(config.realtime.max_rooms_per_connection));
    let broadcaster = Arc::new(Broadcaster::new(registry));
    let jwt = Arc::new(JwtService::new(
        config.auth.jwt_secret.as_bytes(),
        config.auth.token_expiration_seconds as i64,
    ));

    let state = AppState {
        publisher: broadcaster.clone(),
        broadcaster,
        reporting: Arc::new(StoreReportingClient::new(store.clone())),
        store,
        jwt,
        realtime_send_buffer: config.realtime.send_buffer,
    };

    let app = build_router(state);

    let addr = config.server_addr();
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tb_server=debug,tb_api=debug,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();
}

async fn connect_store(config: &AppConfig) -> Option<Arc<dyn WorkflowStore>> {
    let db_config = DatabaseConfig::with_url(&config.database.url);
    match Database::connect(&db_config).await {
        Ok(db) => {
            info!("Connected to database");
            Some(Arc::new(PgWorkflowStore::new(db.pool().clone())))
        }
        Err(e) => {
            warn!("Failed to connect to database: {}", e);
            None
        }
    }
}

fn build_router(state: AppState) -> Router {
    tb_api::router().with_state(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new())
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
    )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
