//! Application configuration constants.
//! Defaults and limits in one place.

use std::sync::OnceLock;
use std::time::Duration;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    config_filename: String,
    thread_prefix: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                config_filename: format!(".{pkg}.toml"),
                thread_prefix: format!("{pkg}-worker"),
            }
        })
    }

    /// Name of the optional settings file looked up in the working directory (e.g. `.rankpool.toml`).
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }

    /// Pool thread name for slot `idx` (e.g. `rankpool-worker-3`).
    pub fn thread_name(&self, idx: usize) -> String {
        format!("{}-{}", self.thread_prefix, idx)
    }
}

// ---- Scheduler ----

/// Scheduler limits and defaults.
pub struct SchedulerDefaults;

impl SchedulerDefaults {
    /// Lowest valid producer priority.
    pub const MIN_PRIORITY: u8 = 1;
    /// Highest valid producer priority.
    pub const MAX_PRIORITY: u8 = 4;
    /// Number of pool threads when not overridden.
    pub const POOL_SIZE: usize = 10;
    /// Simulated business-logic cost per item (ms).
    pub const PROCESSING_DELAY_MS: u64 = 250;
    /// Upper bound on how long an idle worker parks before re-checking queues (ms).
    pub const IDLE_WAIT_MS: u64 = 5;

    pub fn processing_delay() -> Duration {
        Duration::from_millis(Self::PROCESSING_DELAY_MS)
    }

    pub fn idle_wait() -> Duration {
        Duration::from_millis(Self::IDLE_WAIT_MS)
    }
}

// ---- CLI demo ----

/// Defaults for the `rankpool` binary's demo run.
pub struct DemoDefaults;

impl DemoDefaults {
    /// Producer priorities registered when none are given.
    pub const PRODUCERS: [u8; 4] = [1, 2, 3, 4];
    /// Items seeded into each producer queue.
    pub const ITEMS_PER_PRODUCER: usize = 20;
    /// Output channel bound.
    pub const OUTPUT_CAPACITY: usize = 10;
    /// How long the consumer waits for the next item before re-checking for Ctrl-C (ms).
    pub const CONSUMER_POLL_MS: u64 = 100;
}
