//! Ranked producers and their concurrent work queues.

use crossbeam_queue::SegQueue;
use log::info;
use std::cmp::Ordering;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use crate::WorkItem;
use crate::error::{SchedulerError, SchedulerResult};
use crate::utils::config::SchedulerDefaults;

/// Unbounded MPMC FIFO of [`WorkItem`]. Dequeue never blocks; idle workers park on
/// [`WorkQueue::wait_for_item`] and are woken by [`WorkQueue::push`].
#[derive(Default)]
pub struct WorkQueue {
    items: SegQueue<WorkItem>,
    signal: Mutex<()>,
    ready: Condvar,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue at the tail and wake one parked worker.
    pub fn push(&self, item: WorkItem) {
        self.items.push(item);
        self.ready.notify_one();
    }

    /// Non-blocking dequeue from the head.
    pub fn pop(&self) -> Option<WorkItem> {
        self.items.pop()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drop every queued item. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut n = 0;
        while self.items.pop().is_some() {
            n += 1;
        }
        n
    }

    /// Park until an item is pushed, [`WorkQueue::wake_all`] is called, or `timeout` elapses.
    /// Returns immediately when the queue already holds items. Spurious wakeups are fine:
    /// callers re-check the queue themselves.
    pub fn wait_for_item(&self, timeout: Duration) {
        if !self.items.is_empty() {
            return;
        }
        let guard = match self.signal.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        let _ = self.ready.wait_timeout(guard, timeout);
    }

    /// Wake every parked worker (used on stop so they observe the run flag).
    pub fn wake_all(&self) {
        self.ready.notify_all();
    }
}

/// A ranked source of work: a priority in `[1, 4]` plus a shared queue handle.
///
/// Identity is the priority alone: two producers compare equal when their priorities match,
/// whatever their queues hold. Cloning shares the queue.
#[derive(Clone)]
pub struct Producer {
    priority: u8,
    queue: Arc<WorkQueue>,
}

impl Producer {
    /// Validate `priority` and wrap `queue`. Fails with [`SchedulerError::IllegalPriority`]
    /// when the priority is out of range.
    pub fn new(priority: i64, queue: Arc<WorkQueue>) -> SchedulerResult<Self> {
        info!("Configuring new producer with priority {}", priority);
        let min = i64::from(SchedulerDefaults::MIN_PRIORITY);
        let max = i64::from(SchedulerDefaults::MAX_PRIORITY);
        if !(min..=max).contains(&priority) {
            return Err(SchedulerError::IllegalPriority(priority));
        }
        Ok(Self {
            priority: priority as u8,
            queue,
        })
    }

    /// Producer with a fresh empty queue.
    pub fn with_queue(priority: i64) -> SchedulerResult<Self> {
        Self::new(priority, Arc::new(WorkQueue::new()))
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub fn queue(&self) -> &Arc<WorkQueue> {
        &self.queue
    }

    /// Shorthand for `queue().push(item)`.
    pub fn enqueue(&self, item: WorkItem) {
        self.queue.push(item);
    }
}

impl std::fmt::Debug for Producer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Producer")
            .field("priority", &self.priority)
            .field("pending", &self.queue.len())
            .finish()
    }
}

impl PartialEq for Producer {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority
    }
}

impl Eq for Producer {}

impl PartialOrd for Producer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Producer {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority.cmp(&other.priority)
    }
}
