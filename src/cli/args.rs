use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "station-ring-analyzer")]
#[command(about = "Compare station wind observations with gridded reference data in concentric rings")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Hide the progress bar")]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the ring analysis described by a configuration file
    Run {
        #[arg(short, long, help = "Analysis configuration (YAML, TOML or JSON)")]
        config: PathBuf,

        #[arg(long, help = "Override the configured worker thread count")]
        threads: Option<usize>,
    },

    /// Display a station result table
    Info {
        #[arg(short, long)]
        file: PathBuf,
    },
}
