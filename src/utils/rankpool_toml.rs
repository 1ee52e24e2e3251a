//! Load `.rankpool.toml` (CLI only). Lib callers pass [`SchedulerOpts`](crate::SchedulerOpts) directly.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::RunOpts;
use crate::utils::config::PackagePaths;

#[derive(Debug, Default, Deserialize)]
pub struct RankpoolToml {
    #[serde(default)]
    settings: RunSection,
}

#[derive(Debug, Default, Deserialize)]
struct RunSection {
    producers: Option<Vec<i64>>,
    items: Option<usize>,
    capacity: Option<usize>,
    delay_ms: Option<u64>,
    idle_wait_ms: Option<u64>,
    pool_size: Option<usize>,
    help_neighbors: Option<bool>,
    verbose: Option<bool>,
    json: Option<bool>,
}

/// Default settings file location: `.rankpool.toml` in the working directory.
pub fn default_config_path(dir: &Path) -> PathBuf {
    dir.join(PackagePaths::get().config_filename())
}

/// Parse settings from a TOML string.
pub fn parse_rankpool_toml(s: &str) -> Result<RankpoolToml> {
    toml::from_str(s).context("parse rankpool settings")
}

/// Load the settings file at `path`. Missing file → `Ok(None)`; unreadable or malformed → error.
pub fn load_rankpool_toml(path: &Path) -> Result<Option<RankpoolToml>> {
    if !path.exists() {
        return Ok(None);
    }
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("read settings file {}", path.display()))?;
    parse_rankpool_toml(&s)
        .with_context(|| format!("settings file {}", path.display()))
        .map(Some)
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($sec:expr, $opts:expr, $sec_field:ident => $($opts_field:ident).+) => {
        if let Some(v) = $sec.$sec_field {
            $opts.$($opts_field).+ = v;
        }
    };
}

/// Apply file settings to opts (only fields present in the file). Call before applying CLI flags.
pub fn apply_file_to_opts(file: &RankpoolToml, opts: &mut RunOpts) {
    let sec = &file.settings;
    if let Some(ref p) = sec.producers {
        opts.producers = p.clone();
    }
    apply_file_opt!(sec, opts, items => items_per_producer);
    apply_file_opt!(sec, opts, capacity => output_capacity);
    apply_file_opt!(sec, opts, pool_size => scheduler.pool_size);
    apply_file_opt!(sec, opts, help_neighbors => scheduler.help_enabled);
    apply_file_opt!(sec, opts, verbose => verbose);
    apply_file_opt!(sec, opts, json => json);
    if let Some(ms) = sec.delay_ms {
        opts.scheduler.processing_delay = Duration::from_millis(ms);
    }
    if let Some(ms) = sec.idle_wait_ms {
        opts.scheduler.idle_wait = Duration::from_millis(ms);
    }
}
