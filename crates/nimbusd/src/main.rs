//! nimbusd — the nimbus weather aggregation daemon.
//!
//! Serves `GET /weather?q=<location>` with the mean of two upstream
//! provider temperatures, coalescing concurrent same-location requests
//! into batches that share one upstream fan-out. Completed aggregations
//! are persisted to SQLite off the response path.
//!
//! All configuration comes from the environment; see `config.rs`.

mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use nimbus_api::{build_router, ApiState};
use nimbus_coalescer::Coalescer;
use nimbus_fanout::FanOut;
use nimbus_store::{Persistor, QueryStore};
use nimbus_upstream::{WeatherApiClient, WeatherStackClient};

use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,nimbusd=debug".parse().unwrap()),
        )
        .init();

    let config = Config::from_env();
    info!(
        port = config.server_port,
        database_path = %config.database_path.display(),
        max_requests = config.max_requests,
        wait_time_secs = config.wait_time.as_secs_f64(),
        debug_mode = config.debug_mode,
        "starting weather aggregation server"
    );
    if config.weather_api_key.is_empty() || config.weather_stack_key.is_empty() {
        warn!("one or both provider API keys are unset; upstream calls will fail");
    }

    // Store and the fire-and-forget persist writer.
    let store = QueryStore::open(&config.database_path).await?;
    let (persistor, writer) = Persistor::new(store.clone());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let writer_handle = tokio::spawn(writer.run(shutdown_rx));

    // Upstream clients and the per-batch fan-out.
    let provider_a = Arc::new(WeatherApiClient::new(
        &config.weather_api_key,
        config.api_timeout,
    )?);
    let provider_b = Arc::new(WeatherStackClient::new(
        &config.weather_stack_key,
        config.api_timeout,
    )?);
    let fanout = Arc::new(FanOut::new(provider_a, provider_b, persistor));

    let coalescer = Coalescer::new(fanout, config.max_requests, config.wait_time);

    let router = build_router(
        ApiState {
            coalescer,
            store: store.clone(),
        },
        config.debug_mode,
    );
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to install CTRL+C handler");
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    // Let the persist writer drain before closing the store.
    let _ = writer_handle.await;
    store.close().await;
    info!("weather aggregation server stopped");
    Ok(())
}
