//! Engine module: CLI parsing and the demo run built on the scheduler

pub mod arg_parser;
pub mod cli;
pub mod progress;
pub mod runner;

// Re-export commonly used functions
pub use arg_parser::Cli;
pub use cli::{build_opts, handle_run};
pub use runner::{RunSummary, build_producers, run_demo, seed_producers, source_label};
