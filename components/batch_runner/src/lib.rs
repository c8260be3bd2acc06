// components/batch_runner/src/lib.rs
//! Sequential batch processing with cumulative checkpoints.
//!
//! A [`BatchRunner`] feeds an ordered collection of items through a per-item
//! operation, one at a time, and hands the accumulated outcomes to a
//! [`BatchObserver`] whenever another slice of coverage has been reached.
//! The operation is expected to turn its own failures into values, so the
//! runner never aborts because of a single item.

mod runner;
mod threshold;

pub use runner::BatchRunner;
pub use threshold::Threshold;
pub use tokio_util::sync::CancellationToken;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BatchError {
    #[error("checkpoint threshold must be between 1 and 100 percent, got {0}")]
    InvalidThreshold(u32),
}

/// How far a run has come, reported after every item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
}

impl Progress {
    /// Completed fraction in `0.0..=1.0`
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.processed as f64 / self.total as f64
    }

    /// Whole percentage covered, rounded down
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 100;
        }
        (self.processed * 100 / self.total) as u32
    }
}

/// A cumulative snapshot of every outcome produced so far.
///
/// The results are an owned copy; later appends to the live run never reach
/// a snapshot that has already been handed out.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint<O> {
    pub percent: u32,
    pub results: Vec<O>,
}

/// Receives progress and checkpoints from a running batch
pub trait BatchObserver<O> {
    type Error;

    fn on_progress(&mut self, _progress: Progress) {}

    /// Persist or publish a snapshot. An error here ends the run.
    fn on_checkpoint(&mut self, checkpoint: Checkpoint<O>) -> Result<(), Self::Error>;
}

/// Final state of a batch run
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRun<O> {
    pub results: Vec<O>,
    pub total: usize,
    pub checkpoints: usize,
    pub cancelled: bool,
}

impl<O> BatchRun<O> {
    fn new(total: usize) -> Self {
        Self {
            results: Vec::with_capacity(total),
            total,
            checkpoints: 0,
            cancelled: false,
        }
    }

    pub fn processed(&self) -> usize {
        self.results.len()
    }

    pub fn progress(&self) -> Progress {
        Progress {
            processed: self.processed(),
            total: self.total,
        }
    }
}
