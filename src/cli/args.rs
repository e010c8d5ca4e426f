use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::utils::constants::DEFAULT_CONFIG_FILE;

#[derive(Parser)]
#[command(name = "nws-history")]
#[command(about = "Collects NWS station temperature observations into a deduplicated history")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        short,
        long,
        global = true,
        default_value = DEFAULT_CONFIG_FILE,
        help = "Configuration file"
    )]
    pub config: PathBuf,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Hide progress output")]
    pub quiet: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch recent observations, store new ones and ping the healthcheck
    Run,

    /// Report duplicate keys and implausible temperatures in the store
    Check {
        #[arg(long, help = "Collapse duplicate keys to their newest record")]
        repair: bool,
    },

    /// Show the most recent stored readings in the configured timezone
    Recent {
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
}
