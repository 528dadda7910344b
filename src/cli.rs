use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::consts::DEFAULT_MAX_MATCHES;

#[derive(Parser)]
#[command(name = env!("CARGO_PKG_NAME"), version = env!("APP_VERSION"), about = env!("CARGO_PKG_DESCRIPTION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Tune engine parameters through self-play matches
    Tune {
        /// Maximum number of matches to play
        #[arg(long, default_value_t = DEFAULT_MAX_MATCHES)]
        max_matches: usize,

        /// Reset all parameters to 1 before tuning (destructive)
        #[arg(long)]
        from_scratch: bool,

        /// Tuner settings file
        #[arg(short, long, default_value = "matchtuner.toml")]
        config: PathBuf,
    },
}
