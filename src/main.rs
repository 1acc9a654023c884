use clap::Parser;
use station_ring_analyzer::cli::{run, Cli};
use station_ring_analyzer::error::Result;

fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli)
}
