use clap::Parser;
use std::path::PathBuf;

/// Priority-weighted task scheduler demo: seed ranked producers, run the pool, drain the output.
#[derive(Clone, Debug, Parser)]
#[command(name = "rankpool")]
#[command(about = "Run ranked producers through the priority-weighted scheduler and report who got served.")]
pub struct Cli {
    /// Producer priorities, comma separated (each in 1..=4). Duplicates are dropped. Default: 1,2,3,4.
    #[arg(long, short = 'p', value_delimiter = ',', value_parser = clap::value_parser!(i64))]
    pub producers: Option<Vec<i64>>,

    /// Items seeded into each producer queue.
    #[arg(long, short = 'n')]
    pub items: Option<usize>,

    /// Processing delay per item in milliseconds.
    #[arg(long, short = 'd')]
    pub delay_ms: Option<u64>,

    /// Worker pool size (threads).
    #[arg(long)]
    pub pool_size: Option<usize>,

    /// Output channel capacity.
    #[arg(long, short = 'c')]
    pub capacity: Option<usize>,

    /// Let idle workers help neighboring producers (higher priority first).
    #[arg(long, short = 'H', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub help_neighbors: Option<bool>,

    /// Settings file. Default: `.rankpool.toml` in the current directory.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print the summary as JSON.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub json: Option<bool>,

    /// Verbose output (progress bar, debug logs).
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,
}
