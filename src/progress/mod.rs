//! Thread-safe job status
//!
//! A [`ProgressTracker`] owns one [`JobStatus`] behind a single mutex. All
//! reads go through [`ProgressTracker::snapshot`] / [`ProgressTracker::view`]
//! and all writes through [`ProgressTracker::update`], so no field is ever
//! touched outside the lock.

mod log;
mod status;

pub use log::{LogBuffer, LogEntry, LogLevel};
pub use status::{JobState, JobStatus, JobStatusView};

use chrono::Utc;
use std::sync::{Mutex, MutexGuard, PoisonError};

pub const DEFAULT_LOG_CAPACITY: usize = 200;
pub const DEFAULT_LOG_TAIL: usize = 10;

#[derive(Debug)]
pub struct ProgressTracker {
    status: Mutex<JobStatus>,
    log_tail: usize,
}

impl ProgressTracker {
    pub fn new(log_capacity: usize, log_tail: usize) -> Self {
        Self {
            status: Mutex::new(JobStatus::new(log_capacity)),
            log_tail,
        }
    }

    /// Full copy of the status, including the whole log buffer.
    pub fn snapshot(&self) -> JobStatus {
        self.lock().clone()
    }

    /// Polling view with only the most recent log entries.
    pub fn view(&self) -> JobStatusView {
        JobStatusView::from_status(&self.lock(), self.log_tail)
    }

    pub fn state(&self) -> JobState {
        self.read(|s| s.state)
    }

    /// Read part of the status without copying the rest.
    pub fn read<R>(&self, inspect: impl FnOnce(&JobStatus) -> R) -> R {
        inspect(&self.lock())
    }

    /// Mutate the status under the lock.
    pub fn update<R>(&self, mutate: impl FnOnce(&mut JobStatus) -> R) -> R {
        let mut status = self.lock();
        let out = mutate(&mut status);
        status.updated_at = Utc::now();
        out
    }

    /// Append a job log line and mirror it to tracing.
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        let entry = LogEntry::now(level, message);
        match level {
            LogLevel::Info => tracing::info!(job_log = true, "{}", entry.message),
            LogLevel::Warn => tracing::warn!(job_log = true, "{}", entry.message),
            LogLevel::Error => tracing::error!(job_log = true, "{}", entry.message),
        }
        self.update(|status| status.log.push(entry));
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    fn lock(&self) -> MutexGuard<'_, JobStatus> {
        // a panicking writer leaves the status readable
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY, DEFAULT_LOG_TAIL)
    }
}
