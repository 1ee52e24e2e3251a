//! Rankpool: priority-weighted task scheduler with neighbor assist and channel backpressure.
//!
//! Each [`Producer`] owns a queue and a priority in `[1, 4]`. [`Scheduler::start`] runs
//! `priority` workers per producer on a fixed pool; every worker pops from its own queue,
//! runs the [`Processor`](scheduler::Processor) and sends the result into a caller-supplied
//! bounded channel, blocking while it is full.
//!
//! ```ignore
//! let (tx, rx) = crossbeam_channel::bounded(10);
//! let p1 = rankpool::Producer::with_queue(1)?;
//! let p4 = rankpool::Producer::with_queue(4)?;
//! p4.enqueue(rankpool::WorkItem::new("Producer 4", "Message 1"));
//! let scheduler = rankpool::Scheduler::new(vec![p1, p4], tx);
//! scheduler.set_help_enabled(true);
//! scheduler.start()?;
//! let done = rx.recv()?;
//! scheduler.stop();
//! ```

pub mod engine;
pub mod error;
pub mod producer;
pub mod registry;
pub mod scheduler;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use error::{ProcessError, SchedulerError, SchedulerResult};
pub use producer::{Producer, WorkQueue};
pub use registry::ProducerRegistry;
pub use scheduler::{Scheduler, StatsSnapshot};
pub use types::*;

/// Result alias used by the binary and config glue
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;
