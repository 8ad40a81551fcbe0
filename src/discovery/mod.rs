//! Collection discovery
//!
//! A collection listing does not reliably say how many tours it holds, and
//! no single pagination scheme returns all of them. [`CollectionDiscoverer`]
//! fetches the base listing, then runs page-index and page-size probes on a
//! bounded pool, merging every result into one id-keyed set until the
//! reported size is reached or the probes run out.

pub mod parser;
pub mod probe;

pub use parser::{LinkScanParser, PageParser, ParseError, ParsedPage, collection_id_from_url};
pub use probe::{DiscoverySettings, Probe, ProbeKind, needs_probing, plan_probes, probe_workers};

use futures::StreamExt;
use futures::stream;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::fetch::{FetchError, PageFetcher};
use crate::model::{CollectionRecord, TourRef};
use crate::observability::Metrics;
use crate::progress::ProgressTracker;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("could not extract collection id from {0}")]
    InvalidUrl(String),

    #[error("failed to fetch collection page: {0}")]
    Fetch(#[from] FetchError),
}

pub type Result<T> = std::result::Result<T, DiscoveryError>;

pub struct CollectionDiscoverer {
    fetcher: Arc<dyn PageFetcher>,
    parser: Arc<dyn PageParser>,
    settings: DiscoverySettings,
    headers: Vec<(String, String)>,
    metrics: Arc<Metrics>,
}

impl CollectionDiscoverer {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        parser: Arc<dyn PageParser>,
        settings: DiscoverySettings,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            fetcher,
            parser,
            settings,
            headers: Vec::new(),
            metrics,
        }
    }

    /// Extra headers sent with every listing request.
    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    pub fn settings(&self) -> &DiscoverySettings {
        &self.settings
    }

    /// Resolve every tour of the collection at `url`.
    ///
    /// Fails only when the URL has no collection id or the base page cannot
    /// be fetched at all. A non-200 or unparseable base page counts as an
    /// empty first result and probing still runs.
    pub async fn discover(
        &self,
        url: &str,
        tracker: Option<&ProgressTracker>,
    ) -> Result<CollectionRecord> {
        let id = collection_id_from_url(url)
            .ok_or_else(|| DiscoveryError::InvalidUrl(url.to_string()))?;
        let base_url = url.split(['?', '#']).next().unwrap_or(url).to_string();
        let mut record = CollectionRecord::new(id, "", base_url.clone());

        let response = self
            .fetcher
            .fetch_page(&base_url, &self.headers, self.settings.base_max_retries)
            .await?;

        if response.is_success() {
            match self.parser.parse(&response.text()) {
                Ok(page) => {
                    record.name = page.title.unwrap_or_default();
                    record.expected_count = page.expected_count;
                    record.merge_tours(page.tours);
                }
                Err(e) => warn!(collection_id = %record.id, error = %e, "Base page did not parse"),
            }
        } else {
            warn!(
                collection_id = %record.id,
                status = response.status,
                "Base page returned no data"
            );
        }

        let expected = record.expected_count;
        info!(
            collection_id = %record.id,
            found = record.tour_count(),
            expected = ?expected,
            "Parsed base collection page"
        );
        if let Some(t) = tracker {
            t.info(format!(
                "Collection {}: {} tours on first page (expected {})",
                record.display_name(),
                record.tour_count(),
                expected.map_or_else(|| "unknown".to_string(), |n| n.to_string())
            ));
        }

        if needs_probing(record.tour_count(), expected) {
            self.probe(&mut record, &base_url, tracker).await;
        }

        info!(collection_id = %record.id, tours = record.tour_count(), "Discovery finished");
        Ok(record)
    }

    async fn probe(
        &self,
        record: &mut CollectionRecord,
        base_url: &str,
        tracker: Option<&ProgressTracker>,
    ) {
        let expected = record.expected_count;
        let probes = plan_probes(base_url, &self.settings);
        let workers = probe_workers(expected, &self.settings);
        debug!(collection_id = %record.id, probes = probes.len(), workers, "Probing listing");

        let mut results = stream::iter(probes)
            .map(|probe| self.run_probe(probe))
            .buffer_unordered(workers);

        while let Some((probe, tours)) = results.next().await {
            let added = record.merge_tours(tours);
            if added > 0 {
                debug!(
                    collection_id = %record.id,
                    %probe,
                    added,
                    total = record.tour_count(),
                    "Probe found new tours"
                );
                if let Some(t) = tracker {
                    t.info(format!("{probe}: +{added} tours (total {})", record.tour_count()));
                }
            }

            if let Some(n) = expected {
                if record.tour_count() >= n {
                    // dropping the stream abandons the remaining probes
                    debug!(collection_id = %record.id, expected = n, "Reached expected count");
                    break;
                }
            }
        }
    }

    /// One probe request. Any failure is treated as "no tours".
    async fn run_probe(&self, probe: Probe) -> (Probe, Vec<TourRef>) {
        if !self.settings.probe_delay.is_zero() {
            tokio::time::sleep(self.settings.probe_delay).await;
        }
        self.metrics.probe_issued();

        let response = match self
            .fetcher
            .fetch_page(&probe.url, &self.headers, self.settings.probe_max_retries)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                debug!(%probe, error = %e, "Probe failed");
                return (probe, Vec::new());
            }
        };
        if !response.is_success() {
            debug!(%probe, status = response.status, "Probe returned no data");
            return (probe, Vec::new());
        }

        match self.parser.parse(&response.text()) {
            Ok(page) => (probe, page.tours),
            Err(e) => {
                debug!(%probe, error = %e, "Probe page did not parse");
                (probe, Vec::new())
            }
        }
    }
}
