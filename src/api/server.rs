use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, routing::get, routing::post};
use tokio::net::TcpListener;
use tower_http::decompression::RequestDecompressionLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::{services, state::AppState};
use crate::config::{Config, StorageProvider};
use crate::discovery::{CollectionDiscoverer, LinkScanParser};
use crate::fetch::{PageFetcher, ReqwestTransport, RetryingFetcher};
use crate::jobs::{CollectionTourSource, GpxDownloader, JobManager, JobOrchestrator};
use crate::observability::Metrics;
use crate::progress::ProgressTracker;
use crate::storage::StorageClient;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// All routes, without binding a socket.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/jobs", post(services::start_job))
        .route("/jobs/status", get(services::job_status))
        .route("/jobs/results", get(services::job_results))
        .route("/jobs/clear", post(services::clear_results))
        .route("/jobs/stop", post(services::stop_job))
        .route("/collections/discover", post(services::discover_collection))
        .route("/health", get(services::health))
        .with_state(state)
        .layer(RequestDecompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}

/// Wire the production collaborators from configuration.
pub fn build_state(config: Config) -> Result<AppState, AnyError> {
    let metrics = Arc::new(Metrics::new());

    let transport = ReqwestTransport::new(&config.fetch.http_config())
        .map_err(|e| format!("Failed to build HTTP client: {}", e))?;
    let fetcher: Arc<dyn PageFetcher> = Arc::new(RetryingFetcher::new(
        transport,
        config.fetch.request_timeout.as_duration(),
    ));

    let storage = match config.storage.provider {
        StorageProvider::Memory => StorageClient::in_memory(),
        StorageProvider::Local => {
            info!(root = %config.storage.root.display(), "Using local storage");
            StorageClient::local(&config.storage.root)
                .map_err(|e| format!("Failed to open storage: {}", e))?
        }
    };

    let discoverer = Arc::new(CollectionDiscoverer::new(
        Arc::clone(&fetcher),
        Arc::new(LinkScanParser::new(config.source.base_url.clone())),
        config.discovery.settings(&config.fetch),
        Arc::clone(&metrics),
    ));

    let downloader = GpxDownloader::new(
        Arc::clone(&fetcher),
        storage,
        config.source.api_base.clone(),
        config.fetch.max_retries,
        config.jobs.gpx.clone(),
    );
    let orchestrator =
        JobOrchestrator::new(Arc::new(downloader), config.jobs.pools(), Arc::clone(&metrics));
    let source =
        CollectionTourSource::new(Arc::clone(&discoverer), config.source.collections.clone());
    let tracker = ProgressTracker::new(config.jobs.log_capacity, config.jobs.log_tail);

    let jobs = JobManager::new(
        Arc::new(tracker),
        Arc::new(orchestrator),
        Arc::clone(&discoverer),
        Arc::new(source),
        Arc::clone(&metrics),
    );

    Ok(AppState::new(config, jobs, discoverer, metrics))
}

pub async fn run(address: SocketAddr, config: Config) -> Result<(), AnyError> {
    let state = build_state(config)?;
    let app = router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "tourfetch API listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
