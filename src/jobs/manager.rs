use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use super::chunk::{ChunkOutcome, ChunkSpec};
use super::orchestrator::JobOrchestrator;
use super::source::{SetupError, TourSource};
use super::JobError;
use crate::discovery::CollectionDiscoverer;
use crate::model::{CollectionRecord, CollectionTarget, DownloadResult, TourRef};
use crate::observability::Metrics;
use crate::progress::{JobState, JobStatusView, ProgressTracker};

/// What a job downloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Selection {
    Tour {
        id: String,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        url: Option<String>,
    },
    Collections {
        collections: Vec<CollectionTarget>,
    },
    /// Every tour of the configured source, optionally chunked
    AllTours,
}

impl Selection {
    fn describe(&self) -> String {
        match self {
            Selection::Tour { id, .. } => format!("tour {id}"),
            Selection::Collections { collections } => {
                format!("{} collection(s)", collections.len())
            }
            Selection::AllTours => "all tours".to_string(),
        }
    }
}

/// Returned by [`JobManager::start_job`]; the job itself runs in the background.
#[derive(Debug)]
pub struct JobHandle {
    pub job_id: String,
    pub message: String,
    task: JoinHandle<()>,
}

impl JobHandle {
    /// Wait for the background run to finish.
    pub async fn wait(self) {
        if let Err(e) = self.task.await {
            warn!(job_id = %self.job_id, error = %e, "Job task ended abnormally");
        }
    }
}

/// Entry point for starting, polling and clearing jobs.
///
/// Owns the single [`ProgressTracker`]. Cloning shares it.
#[derive(Clone)]
pub struct JobManager {
    tracker: Arc<ProgressTracker>,
    orchestrator: Arc<JobOrchestrator>,
    discoverer: Arc<CollectionDiscoverer>,
    source: Arc<dyn TourSource>,
    metrics: Arc<Metrics>,
}

impl JobManager {
    pub fn new(
        tracker: Arc<ProgressTracker>,
        orchestrator: Arc<JobOrchestrator>,
        discoverer: Arc<CollectionDiscoverer>,
        source: Arc<dyn TourSource>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            tracker,
            orchestrator,
            discoverer,
            source,
            metrics,
        }
    }

    pub fn tracker(&self) -> &Arc<ProgressTracker> {
        &self.tracker
    }

    /// Start a job in the background and return immediately.
    ///
    /// A start while another job is running is accepted; both runs then
    /// write to the same status.
    pub fn start_job(
        &self,
        selection: Selection,
        chunk: Option<ChunkSpec>,
    ) -> Result<JobHandle, JobError> {
        if let Some(ChunkSpec { size: Some(0), .. }) = chunk {
            return Err(JobError::InvalidRequest("chunk size must be positive".into()));
        }
        if let Selection::Collections { collections } = &selection {
            if collections.is_empty() {
                return Err(JobError::InvalidRequest("no collections selected".into()));
            }
        }

        let chunk = match selection {
            Selection::AllTours => chunk.unwrap_or_else(ChunkSpec::unbounded),
            _ => ChunkSpec::unbounded(),
        };

        let job_id = Uuid::now_v7().to_string();
        let keep_history = !chunk.is_fresh();
        let overlapping = self.tracker.update(|s| {
            let running = s.state.is_running();
            s.begin_run(job_id.clone(), keep_history);
            running
        });
        self.metrics.job_started();

        if overlapping {
            warn!(job_id = %job_id, "Starting a job while another one is still running");
            self.tracker.warn("Another job is still running; statuses will interleave");
        }

        let message = if keep_history {
            format!("Resuming {} from offset {}", selection.describe(), chunk.start)
        } else {
            format!("Started downloading {}", selection.describe())
        };
        self.tracker.info(message.clone());
        info!(job_id = %job_id, start = chunk.start, size = ?chunk.size, "Job started");

        let manager = self.clone();
        let task = tokio::spawn(async move { manager.run(selection, chunk).await });

        Ok(JobHandle { job_id, message, task })
    }

    async fn run(&self, selection: Selection, chunk: ChunkSpec) {
        let outcome = match selection {
            Selection::Tour { id, name, url } => {
                let tour = TourRef::new(id, name.unwrap_or_default(), url.unwrap_or_default());
                let record = CollectionRecord::with_tours("", "Single tours", "", [tour]);
                self.download(vec![record]).await
            }
            Selection::Collections { collections } => {
                let records = self.resolve_targets(collections).await;
                self.download(records).await
            }
            Selection::AllTours => match self.source.list_tours(&self.tracker).await {
                Ok(tours) => self.download_chunk(tours, chunk).await,
                Err(e) => {
                    self.fail_setup(e);
                    return;
                }
            },
        };

        let state = outcome.state();
        self.tracker.update(|s| {
            s.state = state;
            s.next_chunk_offset = outcome.next_offset();
            s.advance_progress(1.0);
        });
        match outcome {
            ChunkOutcome::ChunkCompleted { next_offset } => {
                self.tracker.info(format!("Chunk finished; continue from offset {next_offset}"))
            }
            ChunkOutcome::Completed { .. } => self.tracker.info("Job completed"),
        }
    }

    async fn download(&self, records: Vec<CollectionRecord>) -> ChunkOutcome {
        let total: usize = records.iter().map(CollectionRecord::tour_count).sum();
        self.tracker.update(|s| s.items_found = total);
        self.orchestrator.run(&self.tracker, records).await;
        ChunkSpec::unbounded().outcome(total)
    }

    async fn download_chunk(&self, tours: Vec<TourRef>, chunk: ChunkSpec) -> ChunkOutcome {
        let total = tours.len();
        let range = chunk.range(total);
        self.tracker.update(|s| s.items_found = total);
        self.tracker.info(format!(
            "Found {total} tours; processing {}..{}",
            range.start, range.end
        ));

        let slice = tours.into_iter().skip(range.start).take(range.len());
        let record = CollectionRecord::with_tours("all", "Tours", "", slice);
        self.orchestrator.run(&self.tracker, vec![record]).await;
        chunk.outcome(total)
    }

    /// Turn client targets into records, discovering tours where only a URL
    /// was given. Targets that cannot be resolved stay empty.
    async fn resolve_targets(&self, targets: Vec<CollectionTarget>) -> Vec<CollectionRecord> {
        let mut records = Vec::with_capacity(targets.len());
        for target in targets {
            let mut record = target.to_record();
            if record.tour_count() > 0 {
                records.push(record);
                continue;
            }

            match target.url.as_deref() {
                Some(url) if !url.is_empty() => {
                    self.tracker.info(format!("Fetching tours for collection {}", target.label()));
                    match self.discoverer.discover(url, Some(&self.tracker)).await {
                        Ok(found) => {
                            if record.id.is_empty() {
                                record.id = found.id.clone();
                            }
                            if record.name.is_empty() {
                                record.name = found.name.clone();
                            }
                            record.expected_count = found.expected_count;
                            record.merge_tours(found.tour_list());
                        }
                        Err(e) => self
                            .tracker
                            .error(format!("Could not fetch tours for {}: {e}", target.label())),
                    }
                }
                _ => self
                    .tracker
                    .warn(format!("Collection {} has no tours and no URL", target.label())),
            }
            records.push(record);
        }
        records
    }

    fn fail_setup(&self, err: SetupError) {
        self.metrics.job_failed();
        let message = err.to_string();
        self.tracker.error(format!("Job aborted: {message}"));
        self.tracker.update(|s| s.fail(message));
    }

    pub fn status(&self) -> JobStatusView {
        self.tracker.view()
    }

    /// Results so far; partial while a job is running.
    pub fn results(&self) -> Vec<DownloadResult> {
        self.tracker.read(|s| s.results.clone())
    }

    pub fn clear_results(&self) -> Result<(), JobError> {
        self.tracker.update(|s| {
            if s.state.is_running() {
                return Err(JobError::Busy);
            }
            s.results.clear();
            Ok(())
        })
    }

    /// Mark the job idle. Work already in flight keeps running.
    pub fn stop(&self) -> bool {
        let was_running = self.tracker.update(|s| {
            let running = s.state.is_running();
            if running {
                s.state = JobState::Idle;
            }
            running
        });
        if was_running {
            self.tracker.warn("Stop requested; in-flight downloads will still finish");
        }
        was_running
    }
}
