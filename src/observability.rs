//! Observability (tracing setup, counters)

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber.
///
/// `RUST_LOG` wins over `default_filter`. Calling this twice is harmless;
/// the second install is ignored.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Process-wide counters
#[derive(Debug, Default)]
pub struct Metrics {
    jobs_started: AtomicU64,
    jobs_failed: AtomicU64,
    tours_downloaded: AtomicU64,
    tours_failed: AtomicU64,
    probes_issued: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job_started(&self) {
        self.jobs_started.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "jobs_started", "Metric incremented");
    }

    pub fn job_failed(&self) {
        self.jobs_failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "jobs_failed", "Metric incremented");
    }

    pub fn tour_downloaded(&self) {
        self.tours_downloaded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn tour_failed(&self) {
        self.tours_failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "tours_failed", "Metric incremented");
    }

    pub fn probe_issued(&self) {
        self.probes_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            jobs_started: self.jobs_started.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            tours_downloaded: self.tours_downloaded.load(Ordering::Relaxed),
            tours_failed: self.tours_failed.load(Ordering::Relaxed),
            probes_issued: self.probes_issued.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub jobs_started: u64,
    pub jobs_failed: u64,
    pub tours_downloaded: u64,
    pub tours_failed: u64,
    pub probes_issued: u64,
}
