//! Priority-weighted scheduler: one worker per priority point per producer, optional neighbor assist,
//! blocking delivery into a caller-owned bounded channel.

pub mod pool;
pub mod processor;
pub mod state;
pub mod worker;

pub use pool::WorkerPool;
pub use processor::{DelayProcessor, Processor};
pub use state::{Origin, RunState, Stats, StatsSnapshot};
pub use worker::{Assist, find_assist};

use crossbeam_channel::Sender;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{SchedulerError, SchedulerResult};
use crate::registry::ProducerRegistry;
use crate::{Producer, SchedulerOpts, WorkItem};

use worker::{WorkerCtx, run_worker};

pub struct Scheduler {
    registry: Arc<ProducerRegistry>,
    output: Sender<WorkItem>,
    processor: Arc<dyn Processor>,
    state: Arc<RunState>,
    stats: Arc<Stats>,
    pool: Option<WorkerPool>,
    idle_wait: Duration,
}

impl Scheduler {
    /// Scheduler with stock options (250 ms processing delay, 10 pool threads).
    pub fn new(producers: Vec<Producer>, output: Sender<WorkItem>) -> Self {
        Self::with_opts(producers, output, SchedulerOpts::default())
    }

    /// Scheduler using a [`DelayProcessor`] built from `opts.processing_delay`.
    pub fn with_opts(producers: Vec<Producer>, output: Sender<WorkItem>, opts: SchedulerOpts) -> Self {
        let processor = Arc::new(DelayProcessor::new(opts.processing_delay));
        Self::with_processor(producers, output, opts, processor)
    }

    /// Scheduler with a custom processing step. `opts.processing_delay` is ignored.
    pub fn with_processor(
        producers: Vec<Producer>,
        output: Sender<WorkItem>,
        opts: SchedulerOpts,
        processor: Arc<dyn Processor>,
    ) -> Self {
        let registry = ProducerRegistry::register(producers);
        debug!(
            "Registered {} producers requesting {} worker slots",
            registry.count(),
            registry.total_priority()
        );
        Self {
            registry: Arc::new(registry),
            output,
            processor,
            state: Arc::new(RunState::new(opts.help_enabled)),
            stats: Arc::new(Stats::default()),
            pool: Some(WorkerPool::new(opts.pool_size)),
            idle_wait: opts.idle_wait,
        }
    }

    /// Spawn `priority` workers per producer. Returns false (no-op) when already running.
    ///
    /// When the requested slots exceed the pool size, the extra workers wait for a free pool
    /// thread and, since workers only return on stop, effectively do not run during this epoch.
    pub fn start(&self) -> SchedulerResult<bool> {
        let pool = self.pool.as_ref().ok_or(SchedulerError::PoolClosed)?;
        let Some(epoch) = self.state.begin() else {
            warn!("Start requested while already running; ignoring");
            return Ok(false);
        };
        info!("Starting processing (run {})", epoch);

        let requested = self.registry.total_priority();
        if requested > pool.capacity() {
            warn!(
                "Producers request {} workers but the pool has {} threads; {} will wait for a free thread",
                requested,
                pool.capacity(),
                requested - pool.capacity()
            );
        }

        // Highest priority first so its workers claim pool threads before lower ones.
        for producer in self.registry.iter().rev() {
            info!(
                "Starting processing for producer with priority {}",
                producer.priority()
            );
            for _ in 0..producer.priority() {
                let ctx = WorkerCtx {
                    owner: producer.clone(),
                    registry: Arc::clone(&self.registry),
                    state: Arc::clone(&self.state),
                    stats: Arc::clone(&self.stats),
                    processor: Arc::clone(&self.processor),
                    output: self.output.clone(),
                    idle_wait: self.idle_wait,
                    epoch,
                };
                if let Err(e) = pool.submit(move || run_worker(ctx)) {
                    self.state.end();
                    return Err(e);
                }
            }
        }
        Ok(true)
    }

    /// Signal workers to exit after their current item. Returns false (no-op) when already stopped.
    pub fn stop(&self) -> bool {
        if !self.state.end() {
            debug!("Stop requested while not running; ignoring");
            return false;
        }
        info!("Stopping processing");
        for producer in self.registry.iter() {
            producer.queue().wake_all();
        }
        true
    }

    pub fn set_help_enabled(&self, on: bool) {
        debug!("Neighbor assist {}", if on { "enabled" } else { "disabled" });
        self.state.set_help_enabled(on);
    }

    pub fn set_help_disabled(&self) {
        self.set_help_enabled(false);
    }

    pub fn help_enabled(&self) -> bool {
        self.state.help_enabled()
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    pub fn producer_count(&self) -> usize {
        self.registry.count()
    }

    pub fn registry(&self) -> &ProducerRegistry {
        &self.registry
    }

    /// Workers currently inside their loop (any epoch).
    pub fn active_workers(&self) -> usize {
        self.state.active_workers()
    }

    pub fn pool_size(&self) -> usize {
        self.pool.as_ref().map_or(0, WorkerPool::capacity)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Stop, then join every pool thread. Blocks until in-flight items are delivered, so the
    /// output channel must be drained (or its receiver dropped) for this to return.
    pub fn shutdown(mut self) -> anyhow::Result<()> {
        self.stop();
        match self.pool.take() {
            Some(pool) => pool.join(),
            None => Ok(()),
        }
    }
}

impl Drop for Scheduler {
    /// Stop without joining; workers blocked on delivery exit once the channel frees up or closes.
    fn drop(&mut self) {
        self.stop();
    }
}
