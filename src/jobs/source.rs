use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::discovery::CollectionDiscoverer;
use crate::model::TourRef;
use crate::progress::ProgressTracker;

/// Failure before any unit of work is dispatched. Aborts the job.
#[derive(Debug, Clone, Error)]
pub enum SetupError {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("could not list tours: {0}")]
    Listing(String),
}

/// Supplies the full tour list for an "all tours" job.
#[async_trait]
pub trait TourSource: Send + Sync {
    /// Every tour of the selection, in a stable order so chunk offsets
    /// line up between calls.
    async fn list_tours(&self, tracker: &ProgressTracker) -> Result<Vec<TourRef>, SetupError>;
}

/// "All tours" = the union of a configured list of collections.
pub struct CollectionTourSource {
    discoverer: Arc<CollectionDiscoverer>,
    collection_urls: Vec<String>,
}

impl CollectionTourSource {
    pub fn new(discoverer: Arc<CollectionDiscoverer>, collection_urls: Vec<String>) -> Self {
        Self {
            discoverer,
            collection_urls,
        }
    }
}

#[async_trait]
impl TourSource for CollectionTourSource {
    async fn list_tours(&self, tracker: &ProgressTracker) -> Result<Vec<TourRef>, SetupError> {
        if self.collection_urls.is_empty() {
            return Err(SetupError::Listing("no source collections configured".into()));
        }

        let mut tours = BTreeMap::new();
        let mut failures = 0;
        for url in &self.collection_urls {
            match self.discoverer.discover(url, Some(tracker)).await {
                Ok(record) => {
                    for tour in record.tours() {
                        tours.entry(tour.id.clone()).or_insert_with(|| tour.clone());
                    }
                }
                Err(e) => {
                    failures += 1;
                    tracker.error(format!("Could not list {url}: {e}"));
                }
            }
        }

        if failures == self.collection_urls.len() {
            return Err(SetupError::Listing(format!("all {failures} source collections failed")));
        }
        Ok(tours.into_values().collect())
    }
}
