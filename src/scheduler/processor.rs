//! The per-item processing step.

use log::debug;
use std::thread;
use std::time::Duration;

use crate::WorkItem;
use crate::error::ProcessError;

/// Business logic run on every dequeued item before delivery.
pub trait Processor: Send + Sync {
    fn process(&self, item: WorkItem) -> Result<WorkItem, ProcessError>;
}

/// Fixed-cost step: sleeps `delay` and hands the item back unchanged.
#[derive(Clone, Debug)]
pub struct DelayProcessor {
    delay: Duration,
}

impl DelayProcessor {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Processor for DelayProcessor {
    fn process(&self, item: WorkItem) -> Result<WorkItem, ProcessError> {
        debug!("Executing business logic for item {}", item);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        Ok(item)
    }
}

impl<F> Processor for F
where
    F: Fn(WorkItem) -> Result<WorkItem, ProcessError> + Send + Sync,
{
    fn process(&self, item: WorkItem) -> Result<WorkItem, ProcessError> {
        self(item)
    }
}
