//! Nested concurrent execution: collections, then tours within each

use futures::{FutureExt, StreamExt, stream};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info};

use super::downloader::{CollectionContext, DownloadError, TourDownloader};
use crate::model::{CollectionRecord, DownloadResult, TourRef};
use crate::observability::Metrics;
use crate::progress::ProgressTracker;

#[derive(Debug, Clone, Copy)]
pub struct PoolSettings {
    /// Upper bound on collections processed at once
    pub collection_workers: usize,
    /// Upper bound on tours per collection processed at once
    pub tour_workers: usize,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            collection_workers: 3,
            tour_workers: 5,
        }
    }
}

pub struct JobOrchestrator {
    downloader: Arc<dyn TourDownloader>,
    pools: PoolSettings,
    metrics: Arc<Metrics>,
}

impl JobOrchestrator {
    pub fn new(
        downloader: Arc<dyn TourDownloader>,
        pools: PoolSettings,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            downloader,
            pools,
            metrics,
        }
    }

    /// Download every tour of `collections`, recording results in `tracker`.
    ///
    /// `items_total` is set once before dispatch. Failures of single tours
    /// or whole collections are logged and otherwise ignored, so this never
    /// fails. Returns the number of successful downloads.
    pub async fn run(
        &self,
        tracker: &ProgressTracker,
        collections: Vec<CollectionRecord>,
    ) -> usize {
        let total: usize = collections.iter().map(CollectionRecord::tour_count).sum();
        tracker.update(|s| s.items_total = total);

        let workers = self.pools.collection_workers.min(collections.len()).max(1);
        info!(collections = collections.len(), tours = total, workers, "Dispatching downloads");

        let count = collections.len();
        stream::iter(collections.into_iter().enumerate())
            .map(|(idx, record)| self.process_collection(tracker, idx, count, record))
            .buffer_unordered(workers)
            .fold(0, |acc, n| async move { acc + n })
            .await
    }

    async fn process_collection(
        &self,
        tracker: &ProgressTracker,
        idx: usize,
        count: usize,
        record: CollectionRecord,
    ) -> usize {
        let ctx = CollectionContext::for_record(&record);
        tracker.info(format!(
            "Processing collection {}/{}: {} ({} tours)",
            idx + 1,
            count,
            ctx.collection_name,
            record.tour_count()
        ));

        if let Err(e) = self.downloader.prepare_collection(&record, &ctx).await {
            tracker.error(format!("Collection {} failed: {e}", ctx.collection_name));
            return 0;
        }

        let workers = self.pools.tour_workers.min(record.tour_count()).max(1);
        let ctx = &ctx;
        let results: Vec<DownloadResult> = stream::iter(record.tour_list())
            .map(|tour| async move { self.process_tour(tracker, &tour, ctx).await })
            .buffer_unordered(workers)
            .filter_map(|result| async move { result })
            .collect()
            .await;

        if let Err(e) = self.downloader.finish_collection(ctx, &results).await {
            tracker.warn(format!("Could not write summary for {}: {e}", ctx.collection_name));
        }

        debug!(
            collection_id = %ctx.collection_id,
            downloaded = results.len(),
            "Collection finished"
        );
        tracker.info(format!(
            "Collection {}: {}/{} tours downloaded",
            ctx.collection_name,
            results.len(),
            record.tour_count()
        ));
        results.len()
    }

    /// One tour. Errors and panics are contained here.
    async fn process_tour(
        &self,
        tracker: &ProgressTracker,
        tour: &TourRef,
        ctx: &CollectionContext,
    ) -> Option<DownloadResult> {
        let outcome = AssertUnwindSafe(self.downloader.download_tour(tour, ctx))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(DownloadError::Failed("download task panicked".into())));

        match outcome {
            Ok(result) => {
                self.metrics.tour_downloaded();
                tracker.update(|s| {
                    s.results.push(result.clone());
                    s.items_completed += 1;
                    s.refresh_progress();
                });
                Some(result)
            }
            Err(e) => {
                self.metrics.tour_failed();
                tracker.update(|s| {
                    s.items_completed += 1;
                    s.items_failed += 1;
                    s.refresh_progress();
                });
                tracker.error(format!(
                    "Error downloading tour {} ({}): {e}",
                    tour.id,
                    tour.display_name()
                ));
                None
            }
        }
    }
}
