use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::progress::JobState;

/// Sub-range of an "all tours" selection processed by one job run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSpec {
    #[serde(default)]
    pub start: usize,
    /// `None` means "to the end"
    #[serde(default)]
    pub size: Option<usize>,
}

impl ChunkSpec {
    pub fn unbounded() -> Self {
        Self { start: 0, size: None }
    }

    pub fn new(start: usize, size: usize) -> Self {
        Self {
            start,
            size: Some(size),
        }
    }

    /// A run from offset 0 starts a brand-new job.
    pub fn is_fresh(&self) -> bool {
        self.start == 0
    }

    fn end(&self) -> Option<usize> {
        self.size.map(|size| self.start.saturating_add(size))
    }

    /// Indices of the `total` tours this chunk covers. Empty when `start`
    /// is past the end.
    pub fn range(&self, total: usize) -> Range<usize> {
        let start = self.start.min(total);
        let end = self.end().map_or(total, |end| end.min(total));
        start..end.max(start)
    }

    pub fn outcome(&self, total: usize) -> ChunkOutcome {
        match self.end() {
            Some(end) if end < total => ChunkOutcome::ChunkCompleted { next_offset: end },
            _ => ChunkOutcome::Completed { next_offset: total },
        }
    }
}

/// Final state of a chunked run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// More tours remain; resume from `next_offset`.
    ChunkCompleted { next_offset: usize },
    Completed { next_offset: usize },
}

impl ChunkOutcome {
    pub fn state(&self) -> JobState {
        match self {
            ChunkOutcome::ChunkCompleted { .. } => JobState::ChunkCompleted,
            ChunkOutcome::Completed { .. } => JobState::Completed,
        }
    }

    pub fn next_offset(&self) -> usize {
        match *self {
            ChunkOutcome::ChunkCompleted { next_offset }
            | ChunkOutcome::Completed { next_offset } => next_offset,
        }
    }
}
