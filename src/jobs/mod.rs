//! Download jobs
//!
//! - [`JobManager`] - start/poll/results/clear/stop over one shared status
//! - [`JobOrchestrator`] - nested bounded pools (collections, then tours)
//! - [`ChunkSpec`] - resumable sub-ranges of an "all tours" job
//! - [`TourDownloader`] / [`TourSource`] - injected collaborators

pub mod chunk;
pub mod downloader;
pub mod manager;
pub mod orchestrator;
pub mod source;

pub use chunk::{ChunkOutcome, ChunkSpec};
pub use downloader::{CollectionContext, DownloadError, GpxDownloader, GpxOptions, TourDownloader};
pub use manager::{JobHandle, JobManager, Selection};
pub use orchestrator::{JobOrchestrator, PoolSettings};
pub use source::{CollectionTourSource, SetupError, TourSource};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("a job is running")]
    Busy,

    #[error("invalid job request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Setup(#[from] SetupError),
}
