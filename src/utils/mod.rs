pub mod config;
pub mod logger;
pub mod rankpool_toml;

pub use config::*;
pub use logger::setup_logging;
pub use rankpool_toml::{
    RankpoolToml, apply_file_to_opts, default_config_path, load_rankpool_toml, parse_rankpool_toml,
};
