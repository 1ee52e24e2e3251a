//! Shared run state and counters handed to every worker through an `Arc`.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

/// Cross-thread run flags. `epoch` is bumped on every start so workers left over
/// from a previous run exit even if `running` has been set again.
#[derive(Debug, Default)]
pub struct RunState {
    running: AtomicBool,
    help_enabled: AtomicBool,
    epoch: AtomicU64,
    active_workers: AtomicUsize,
}

impl RunState {
    pub fn new(help_enabled: bool) -> Self {
        Self {
            help_enabled: AtomicBool::new(help_enabled),
            ..Self::default()
        }
    }

    /// Flip to running and open a new epoch. Returns `None` when already running.
    pub fn begin(&self) -> Option<u64> {
        if self.running.swap(true, Ordering::SeqCst) {
            return None;
        }
        Some(self.epoch.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Flip to stopped. Returns false when it was already stopped.
    pub fn end(&self) -> bool {
        self.running.swap(false, Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// True while a worker spawned in `epoch` should keep looping.
    pub fn is_current(&self, epoch: u64) -> bool {
        self.is_running() && self.epoch.load(Ordering::SeqCst) == epoch
    }

    pub fn help_enabled(&self) -> bool {
        self.help_enabled.load(Ordering::Acquire)
    }

    pub fn set_help_enabled(&self, on: bool) {
        self.help_enabled.store(on, Ordering::Release);
    }

    pub fn active_workers(&self) -> usize {
        self.active_workers.load(Ordering::SeqCst)
    }

    pub(crate) fn worker_entered(&self) {
        self.active_workers.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn worker_left(&self) {
        self.active_workers.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Which queue a delivered item came from, relative to the worker that handled it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    Own,
    Above,
    Below,
}

/// Delivery counters, updated by workers after each successful send.
#[derive(Debug, Default)]
pub struct Stats {
    delivered: AtomicU64,
    assisted_up: AtomicU64,
    assisted_down: AtomicU64,
    failed: AtomicU64,
    by_source: Mutex<BTreeMap<u8, u64>>,
}

/// Point-in-time copy of [`Stats`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub delivered: u64,
    pub assisted_up: u64,
    pub assisted_down: u64,
    /// Items dropped because the processing step failed.
    pub failed: u64,
    /// Delivered items keyed by the priority of the producer they were taken from.
    pub by_source: BTreeMap<u8, u64>,
}

impl Stats {
    pub(crate) fn record(&self, source_priority: u8, origin: Origin) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
        match origin {
            Origin::Own => {}
            Origin::Above => {
                self.assisted_up.fetch_add(1, Ordering::Relaxed);
            }
            Origin::Below => {
                self.assisted_down.fetch_add(1, Ordering::Relaxed);
            }
        }
        let mut by_source = match self.by_source.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        *by_source.entry(source_priority).or_insert(0) += 1;
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let by_source = match self.by_source.lock() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        StatsSnapshot {
            delivered: self.delivered.load(Ordering::Relaxed),
            assisted_up: self.assisted_up.load(Ordering::Relaxed),
            assisted_down: self.assisted_down.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            by_source,
        }
    }
}
