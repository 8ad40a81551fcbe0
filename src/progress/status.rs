use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::log::{LogBuffer, LogEntry};
use crate::model::DownloadResult;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    #[default]
    Idle,
    Running,
    ChunkCompleted,
    Completed,
    Error,
}

impl JobState {
    pub fn is_running(&self) -> bool {
        matches!(self, JobState::Running)
    }
}

/// Mutable status of the current job. Only reachable through
/// [`ProgressTracker`](super::ProgressTracker).
#[derive(Debug, Clone)]
pub struct JobStatus {
    pub job_id: Option<String>,
    pub state: JobState,
    /// Fraction in `[0, 1]`, never decreasing within one run
    pub progress: f64,
    /// Tours in the whole selection (before chunking)
    pub items_found: usize,
    /// Denominator for `progress`, fixed once the run dispatches work
    pub items_total: usize,
    /// Attempted units, failed ones included
    pub items_completed: usize,
    pub items_failed: usize,
    pub error: Option<String>,
    pub log: LogBuffer,
    /// Completion order, not input order
    pub results: Vec<DownloadResult>,
    pub next_chunk_offset: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl JobStatus {
    pub fn new(log_capacity: usize) -> Self {
        Self {
            job_id: None,
            state: JobState::Idle,
            progress: 0.0,
            items_found: 0,
            items_total: 0,
            items_completed: 0,
            items_failed: 0,
            error: None,
            log: LogBuffer::new(log_capacity),
            results: Vec::new(),
            next_chunk_offset: 0,
            started_at: None,
            updated_at: Utc::now(),
        }
    }

    /// Enter `running` for a new run.
    ///
    /// Counters always restart. `results` and `log` survive only when
    /// `keep_history` is set, i.e. when resuming a chunked job.
    pub fn begin_run(&mut self, job_id: String, keep_history: bool) {
        if !keep_history {
            self.results.clear();
            self.log.clear();
            self.next_chunk_offset = 0;
        }
        self.job_id = Some(job_id);
        self.state = JobState::Running;
        self.progress = 0.0;
        self.items_found = 0;
        self.items_total = 0;
        self.items_completed = 0;
        self.items_failed = 0;
        self.error = None;
        self.started_at = Some(Utc::now());
    }

    /// Raise `progress` to `items_completed / items_total`, clamped to 1.
    pub fn refresh_progress(&mut self) {
        let ratio = if self.items_total == 0 {
            1.0
        } else {
            self.items_completed as f64 / self.items_total as f64
        };
        self.advance_progress(ratio);
    }

    pub fn advance_progress(&mut self, value: f64) {
        self.progress = self.progress.max(value.clamp(0.0, 1.0));
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.state = JobState::Error;
        self.error = Some(message.into());
    }
}

/// What pollers see: the status with only the tail of the log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusView {
    pub job_id: Option<String>,
    pub status: JobState,
    pub progress: f64,
    pub items_found: usize,
    pub items_total: usize,
    pub items_completed: usize,
    pub items_failed: usize,
    pub error: Option<String>,
    pub log: Vec<LogEntry>,
    pub results: Vec<DownloadResult>,
    pub next_chunk_offset: usize,
    #[serde(with = "chrono::serde::ts_seconds_option")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub updated_at: DateTime<Utc>,
}

impl JobStatusView {
    pub fn from_status(status: &JobStatus, log_tail: usize) -> Self {
        Self {
            job_id: status.job_id.clone(),
            status: status.state,
            progress: status.progress,
            items_found: status.items_found,
            items_total: status.items_total,
            items_completed: status.items_completed,
            items_failed: status.items_failed,
            error: status.error.clone(),
            log: status.log.tail(log_tail),
            results: status.results.clone(),
            next_chunk_offset: status.next_chunk_offset,
            started_at: status.started_at,
            updated_at: status.updated_at,
        }
    }
}
