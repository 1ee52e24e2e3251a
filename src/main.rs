//! Rankpool CLI: seed ranked producers, run the scheduler, report per-priority throughput.

use anyhow::Result;
use clap::Parser;
use rankpool::engine::arg_parser::Cli;
use rankpool::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
