//! Public types for the rankpool API: work items and scheduler options.

use std::fmt;
use std::time::Duration;

use crate::utils::config::SchedulerDefaults;

/// A unit of work with provenance and an opaque payload. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkItem {
    source_info: String,
    item_id: String,
    payload: String,
}

impl WorkItem {
    /// Build an item; the payload is the hex blake3 digest of a fresh random UUID.
    pub fn new(source_info: impl Into<String>, item_id: impl Into<String>) -> Self {
        let seed = uuid::Uuid::new_v4();
        let payload = blake3::hash(seed.to_string().as_bytes()).to_hex().to_string();
        Self::with_payload(source_info, item_id, payload)
    }

    /// Build an item with a caller-computed payload.
    pub fn with_payload(
        source_info: impl Into<String>,
        item_id: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            source_info: source_info.into(),
            item_id: item_id.into(),
            payload: payload.into(),
        }
    }

    pub fn source_info(&self) -> &str {
        &self.source_info
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "producer - {}, item id - {}, value - {}",
            self.source_info, self.item_id, self.payload
        )
    }
}

/// Tuning for [`Scheduler`](crate::Scheduler). `Default` gives the stock values from [`SchedulerDefaults`].
#[derive(Clone, Debug)]
pub struct SchedulerOpts {
    /// Fixed cost of the default processing step.
    pub processing_delay: Duration,
    /// Number of pool threads. Worker tasks beyond this wait for a free thread.
    pub pool_size: usize,
    /// Max park time for an idle worker before it re-checks its queues.
    pub idle_wait: Duration,
    /// Start with neighbor assist already on.
    pub help_enabled: bool,
}

impl Default for SchedulerOpts {
    fn default() -> Self {
        Self {
            processing_delay: SchedulerDefaults::processing_delay(),
            pool_size: SchedulerDefaults::POOL_SIZE,
            idle_wait: SchedulerDefaults::idle_wait(),
            help_enabled: false,
        }
    }
}

impl SchedulerOpts {
    /// Stock options with a different processing delay.
    pub fn with_delay(processing_delay: Duration) -> Self {
        Self {
            processing_delay,
            ..Self::default()
        }
    }
}

/// Full options for the CLI demo run. Library users only need [`SchedulerOpts`].
#[derive(Clone, Debug)]
pub struct RunOpts {
    /// Priorities of the producers to register (duplicates are dropped by the registry).
    pub producers: Vec<i64>,
    /// Items seeded into each producer queue before start.
    pub items_per_producer: usize,
    /// Bound of the output channel.
    pub output_capacity: usize,
    pub scheduler: SchedulerOpts,
    /// Show progress bar and debug logs.
    pub verbose: bool,
    /// Print the run summary as JSON.
    pub json: bool,
}

impl Default for RunOpts {
    fn default() -> Self {
        use crate::utils::config::DemoDefaults;
        Self {
            producers: DemoDefaults::PRODUCERS.iter().map(|&p| i64::from(p)).collect(),
            items_per_producer: DemoDefaults::ITEMS_PER_PRODUCER,
            output_capacity: DemoDefaults::OUTPUT_CAPACITY,
            scheduler: SchedulerOpts::default(),
            verbose: false,
            json: false,
        }
    }
}
