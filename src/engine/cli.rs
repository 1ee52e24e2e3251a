//! CLI command handler: merge settings file and flags, run the demo, print the summary.

use anyhow::{Context, Result};
use log::{debug, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::RunOpts;
use crate::engine::arg_parser::Cli;
use crate::engine::runner::{RunSummary, run_demo, source_label};
use crate::utils::{apply_file_to_opts, default_config_path, load_rankpool_toml, setup_logging};

/// Defaults, then settings file, then flags.
pub fn build_opts(cli: &Cli) -> Result<RunOpts> {
    let mut opts = RunOpts::default();
    let path = match cli.config.clone() {
        Some(p) => p,
        None => default_config_path(&std::env::current_dir().context("current directory")?),
    };
    if let Some(file) = load_rankpool_toml(&path)? {
        apply_file_to_opts(&file, &mut opts);
    }
    if let Some(ref p) = cli.producers {
        opts.producers = p.clone();
    }
    if let Some(n) = cli.items {
        opts.items_per_producer = n;
    }
    if let Some(ms) = cli.delay_ms {
        opts.scheduler.processing_delay = Duration::from_millis(ms);
    }
    if let Some(n) = cli.pool_size {
        opts.scheduler.pool_size = n;
    }
    if let Some(n) = cli.capacity {
        opts.output_capacity = n;
    }
    if let Some(on) = cli.help_neighbors {
        opts.scheduler.help_enabled = on;
    }
    if let Some(v) = cli.verbose {
        opts.verbose = v;
    }
    if let Some(j) = cli.json {
        opts.json = j;
    }
    Ok(opts)
}

fn print_summary(summary: &RunSummary) {
    println!(
        "Received {}/{} items in {} ms ({} still queued)",
        summary.received, summary.seeded, summary.elapsed_ms, summary.left_in_queues
    );
    for &priority in &summary.producers {
        let label = source_label(priority);
        let n = summary.received_by_source.get(&label).copied().unwrap_or(0);
        println!("  priority {}: {} items", priority, n);
    }
    println!(
        "  assisted: {} from higher, {} from lower",
        summary.stats.assisted_up, summary.stats.assisted_down
    );
    if summary.stats.failed > 0 {
        println!("  failed: {} items dropped", summary.stats.failed);
    }
}

/// Run the demo described by `cli`.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let opts = build_opts(cli)?;
    setup_logging(opts.verbose);
    debug!("{} CONFIG: {:#?}", env!("CARGO_PKG_NAME").to_uppercase(), opts);

    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_handler = Arc::clone(&cancel);
    ctrlc::set_handler(move || {
        cancel_handler.store(true, Ordering::Relaxed);
    })
    .context("set Ctrl+C handler")?;

    let summary = run_demo(&opts, cancel)?;
    if opts.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("serialize summary")?
        );
    } else {
        print_summary(&summary);
    }
    if summary.cancelled {
        warn!("Run cancelled by user; {} items left queued", summary.left_in_queues);
    }
    Ok(())
}
