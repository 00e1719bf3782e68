//! API server entry point.

use std::sync::Arc;

use domain::{InMemoryUserDirectory, UserDirectory};
use metrics_exporter_prometheus::PrometheusHandle;
use ticket_store::{
    HoldStore, InventoryStore, OrderStore, PostgresHoldStore, PostgresInventoryStore,
    PostgresOrderStore,
};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use api::AppState;
use api::config::Config;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

async fn serve<I, O, H, U>(
    state: Arc<AppState<I, O, H, U>>,
    metrics_handle: PrometheusHandle,
    addr: &str,
) where
    I: InventoryStore + Clone + 'static,
    O: OrderStore + Clone + 'static,
    H: HoldStore + Clone + 'static,
    U: UserDirectory + Clone + 'static,
{
    let app = api::create_app(state, metrics_handle);

    tracing::info!(%addr, "starting API server");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    let addr = config.addr();

    // 3. Pick the storage backend and run the server
    match config.database_url.clone() {
        Some(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(10)
                .connect(&url)
                .await
                .expect("failed to connect to database");

            let inventory = PostgresInventoryStore::new(pool.clone());
            inventory
                .run_migrations()
                .await
                .expect("failed to run migrations");

            let state = api::create_state(
                inventory,
                PostgresOrderStore::new(pool.clone()),
                PostgresHoldStore::new(pool, config.hold_ttl()),
                InMemoryUserDirectory::new(),
            );
            serve(state, metrics_handle, &addr).await;
        }
        None => {
            let state = api::create_default_state(config.hold_ttl());
            serve(state, metrics_handle, &addr).await;
        }
    }

    tracing::info!("server shut down gracefully");
}
