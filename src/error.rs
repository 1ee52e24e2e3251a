//! Error types for producers, workers and the pool.

use thiserror::Error;

use crate::utils::config::SchedulerDefaults;

/// Failure inside a [`Processor`](crate::scheduler::Processor) step.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Processing was abandoned before a result was produced.
    #[error("processing cancelled: {0}")]
    Cancelled(String),
    #[error("processing failed: {0}")]
    Failed(String),
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Producer priority outside `[MIN_PRIORITY, MAX_PRIORITY]`.
    #[error(
        "Wrong priority has been setup ({0}). It must be >= {min} and <= {max}.",
        min = SchedulerDefaults::MIN_PRIORITY,
        max = SchedulerDefaults::MAX_PRIORITY
    )]
    IllegalPriority(i64),

    /// Receiver side of the output channel was dropped while delivering.
    #[error("output channel closed")]
    OutputClosed,

    #[error(transparent)]
    Process(#[from] ProcessError),

    /// The worker pool has no live threads left to accept jobs.
    #[error("worker pool closed")]
    PoolClosed,
}

pub type SchedulerResult<T> = std::result::Result<T, SchedulerError>;
