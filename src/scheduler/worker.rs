//! Worker loop and the neighbor-assist search.

use crossbeam_channel::Sender;
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ProcessError, SchedulerError, SchedulerResult};
use crate::registry::ProducerRegistry;
use crate::scheduler::processor::Processor;
use crate::scheduler::state::{Origin, RunState, Stats};
use crate::{Producer, WorkItem};

/// Everything one worker needs; cloned per spawned task.
#[derive(Clone)]
pub(crate) struct WorkerCtx {
    pub owner: Producer,
    pub registry: Arc<ProducerRegistry>,
    pub state: Arc<RunState>,
    pub stats: Arc<Stats>,
    pub processor: Arc<dyn Processor>,
    pub output: Sender<WorkItem>,
    pub idle_wait: Duration,
    pub epoch: u64,
}

/// An item taken from a neighbor queue, with the neighbor's priority and direction.
#[derive(Debug)]
pub struct Assist {
    pub item: WorkItem,
    pub source_priority: u8,
    pub origin: Origin,
}

/// Walk from `owner` in one direction, skipping empty queues, and take the first item found.
fn scan<'a, F>(registry: &'a ProducerRegistry, owner: &'a Producer, step: F) -> Option<(u8, WorkItem)>
where
    F: Fn(&'a ProducerRegistry, &'a Producer) -> Option<&'a Producer>,
{
    let mut current = owner;
    while let Some(next) = step(registry, current) {
        if let Some(item) = next.queue().pop() {
            return Some((next.priority(), item));
        }
        current = next;
    }
    None
}

/// Neighbor search for an idle worker of `owner`: every higher producer (nearest first),
/// then, only if none of them had work, every lower producer (nearest first).
pub fn find_assist(registry: &ProducerRegistry, owner: &Producer) -> Option<Assist> {
    if let Some((source_priority, item)) = scan(registry, owner, ProducerRegistry::neighbor_above)
    {
        return Some(Assist {
            item,
            source_priority,
            origin: Origin::Above,
        });
    }
    scan(registry, owner, ProducerRegistry::neighbor_below).map(|(source_priority, item)| Assist {
        item,
        source_priority,
        origin: Origin::Below,
    })
}

impl WorkerCtx {
    /// Process and deliver one item. Blocks while the output channel is full.
    /// A failed step drops the item and keeps the worker going; cancellation ends it.
    fn handle(&self, item: WorkItem, source_priority: u8, origin: Origin) -> SchedulerResult<()> {
        let processed = match self.processor.process(item) {
            Ok(processed) => processed,
            Err(ProcessError::Failed(reason)) => {
                warn!(
                    "Dropping item from producer {} (worker {}): {}",
                    source_priority,
                    self.owner.priority(),
                    reason
                );
                self.stats.record_failed();
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        self.output
            .send(processed)
            .map_err(|_| SchedulerError::OutputClosed)?;
        self.stats.record(source_priority, origin);
        Ok(())
    }

    /// One idle-cycle assist. Returns true when a neighbor item was handled.
    fn assist(&self) -> SchedulerResult<bool> {
        let Some(Assist {
            item,
            source_priority,
            origin,
        }) = find_assist(&self.registry, &self.owner)
        else {
            return Ok(false);
        };
        debug!(
            "Helping {:?} producer {} with item. My priority {}",
            origin,
            source_priority,
            self.owner.priority()
        );
        self.handle(item, source_priority, origin)?;
        Ok(true)
    }

    fn run_loop(&self) -> SchedulerResult<()> {
        let queue = self.owner.queue();
        while self.state.is_current(self.epoch) {
            if let Some(item) = queue.pop() {
                self.handle(item, self.owner.priority(), Origin::Own)?;
                continue;
            }
            if self.state.help_enabled() && self.assist()? {
                continue;
            }
            queue.wait_for_item(self.idle_wait);
        }
        Ok(())
    }
}

/// Keeps `active_workers` accurate even if the processor panics.
struct ActiveGuard<'a>(&'a RunState);

impl<'a> ActiveGuard<'a> {
    fn enter(state: &'a RunState) -> Self {
        state.worker_entered();
        Self(state)
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.worker_left();
    }
}

/// Worker entry point: loop until stopped or a newer epoch starts. Errors end only this worker.
pub(crate) fn run_worker(ctx: WorkerCtx) {
    let priority = ctx.owner.priority();
    debug!("Starting worker for producer {}", priority);
    let outcome = {
        let _active = ActiveGuard::enter(&ctx.state);
        ctx.run_loop()
    };
    match outcome {
        Ok(()) => debug!("Worker for producer {} exited", priority),
        Err(e) => warn!("Worker for producer {} aborted: {}", priority, e),
    }
}
