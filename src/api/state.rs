use std::sync::Arc;

use crate::config::Config;
use crate::discovery::CollectionDiscoverer;
use crate::jobs::JobManager;
use crate::observability::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub jobs: JobManager,
    pub discoverer: Arc<CollectionDiscoverer>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(
        config: Config,
        jobs: JobManager,
        discoverer: Arc<CollectionDiscoverer>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            jobs,
            discoverer,
            metrics,
        }
    }
}
