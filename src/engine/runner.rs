//! Demo run: seed producers, start the scheduler, drain the output channel, summarize.

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError, bounded};
use log::{debug, info};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::engine::progress::{
    ProgressBar, create_progress_bar, finish_progress_bar, update_progress_bar,
};
use crate::scheduler::StatsSnapshot;
use crate::utils::config::DemoDefaults;
use crate::{Producer, RunOpts, Scheduler, WorkItem};

/// What a demo run produced. Serialized as-is for `--json`.
#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    /// Registered priorities after dedup, ascending.
    pub producers: Vec<u8>,
    pub seeded: usize,
    pub received: usize,
    /// Items received keyed by the item's source label.
    pub received_by_source: BTreeMap<String, usize>,
    pub left_in_queues: usize,
    pub stats: StatsSnapshot,
    pub elapsed_ms: u64,
    pub cancelled: bool,
}

impl RunSummary {
    fn record(&mut self, item: &WorkItem) {
        self.received += 1;
        *self
            .received_by_source
            .entry(item.source_info().to_string())
            .or_insert(0) += 1;
    }
}

/// Source label used for items seeded into the producer with `priority`.
pub fn source_label(priority: u8) -> String {
    format!("Producer {priority}")
}

/// Build producers from raw priorities. The first invalid priority aborts the run.
pub fn build_producers(priorities: &[i64]) -> Result<Vec<Producer>> {
    priorities
        .iter()
        .map(|&p| Producer::with_queue(p).with_context(|| format!("producer priority {p}")))
        .collect()
}

/// Push `n` items into every registered producer. Returns the total seeded.
pub fn seed_producers(scheduler: &Scheduler, n: usize) -> usize {
    let mut total = 0;
    for producer in scheduler.registry().iter() {
        let label = source_label(producer.priority());
        for i in 1..=n {
            producer.enqueue(WorkItem::new(label.clone(), format!("Message {i}")));
        }
        total += n;
    }
    total
}

/// Receive until `target` items arrived or `cancel` is set.
fn consume(
    rx: &Receiver<WorkItem>,
    target: usize,
    cancel: &AtomicBool,
    bar: Option<&ProgressBar>,
    summary: &mut RunSummary,
) {
    let poll = Duration::from_millis(DemoDefaults::CONSUMER_POLL_MS);
    while summary.received < target {
        if cancel.load(Ordering::Relaxed) {
            summary.cancelled = true;
            return;
        }
        match rx.recv_timeout(poll) {
            Ok(item) => {
                summary.record(&item);
                if let Some(bar) = bar {
                    update_progress_bar(bar, 1);
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}

/// After stop: keep draining so workers blocked on a full channel can finish, until none are left.
fn drain_until_idle(rx: &Receiver<WorkItem>, scheduler: &Scheduler, summary: &mut RunSummary) {
    let poll = Duration::from_millis(DemoDefaults::CONSUMER_POLL_MS);
    while scheduler.active_workers() > 0 {
        if let Ok(item) = rx.recv_timeout(poll) {
            summary.record(&item);
        }
    }
    for item in rx.try_iter() {
        summary.record(&item);
    }
}

/// Run the full demo. `cancel` is polled by the consumer (set from the Ctrl-C handler).
pub fn run_demo(opts: &RunOpts, cancel: Arc<AtomicBool>) -> Result<RunSummary> {
    let started = Instant::now();
    let producers = build_producers(&opts.producers)?;
    let (tx, rx) = bounded::<WorkItem>(opts.output_capacity.max(1));
    let scheduler = Scheduler::with_opts(producers, tx, opts.scheduler.clone());

    let mut summary = RunSummary {
        producers: scheduler.registry().iter().map(|p| p.priority()).collect(),
        ..RunSummary::default()
    };
    summary.seeded = seed_producers(&scheduler, opts.items_per_producer);
    info!(
        "Seeded {} items across {} producers",
        summary.seeded,
        scheduler.producer_count()
    );

    let bar = opts
        .verbose
        .then(|| create_progress_bar(summary.seeded, "Consuming"));

    scheduler.start()?;
    consume(&rx, summary.seeded, &cancel, bar.as_ref(), &mut summary);
    scheduler.stop();
    drain_until_idle(&rx, &scheduler, &mut summary);
    if let Some(bar) = bar.as_ref() {
        finish_progress_bar(bar);
    }

    summary.left_in_queues = scheduler.registry().pending();
    summary.stats = scheduler.stats();
    debug!("Joining worker pool");
    scheduler.shutdown()?;
    summary.elapsed_ms = started.elapsed().as_millis() as u64;
    Ok(summary)
}
