//! Encore API Server Entry Point
//!
//! Wires the cache store, upstream gateways, background jobs and HTTP
//! router together, then serves until Ctrl-C.

use std::sync::Arc;

use encore_api::telemetry::{init_tracing, TelemetryConfig};
use encore_api::{
    create_api_router, ActService, ActServiceConfig, ApiConfig, ApiError, ApiResult, AppState,
    CacheUpdater, CacheUpdaterConfig, Enricher, FetchQueue, FetchQueueConfig,
};
use encore_core::{CacheHealth, EncoreError};
use encore_storage::{ActStore, LmdbActStore};
use encore_upstream::{BandsintownClient, BandsintownConfig, MusicBrainzClient, MusicBrainzConfig};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::default();
    init_tracing(&telemetry_config)?;

    let config = ApiConfig::from_env()?;

    let store: Arc<dyn ActStore> = Arc::new(
        LmdbActStore::open(&config.store_path, config.store_max_size_mb)
            .map_err(EncoreError::from)?,
    );
    tracing::info!(path = %config.store_path.display(), "Cache store opened");

    let metadata = Arc::new(MusicBrainzClient::new(MusicBrainzConfig::from_env())?);
    let events = Arc::new(BandsintownClient::new(BandsintownConfig::from_env())?);
    let enricher = Enricher::new(metadata, events);

    let health = Arc::new(CacheHealth::new());
    let queue = FetchQueue::new(Arc::clone(&store), enricher.clone(), FetchQueueConfig::from_env());

    // Runs for the lifetime of the process.
    let updater = Arc::new(CacheUpdater::new(
        Arc::clone(&store),
        enricher.clone(),
        CacheUpdaterConfig::from_env(),
    ));
    let _updater_task = updater.spawn();

    let service_config = ActServiceConfig {
        read_timeout: config.cache_read_timeout,
    };
    let service = Arc::new(ActService::new(
        Arc::clone(&store),
        enricher,
        Arc::new(queue.clone()),
        health,
        service_config,
    ));

    let state = AppState::new(service, store, queue, config.cache_read_timeout);
    let app = create_api_router(state);

    tracing::info!(addr = %config.bind, "Starting Encore API server");
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", config.bind, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;

    tracing::info!("Encore API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
