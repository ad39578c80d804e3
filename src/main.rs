//! Seedsort: pumpkin seed classification CLI
//!
//! Trains the preprocessing pipeline and classifier once, freezes every
//! parameter in a bundle, and serves predictions from that bundle.

use anyhow::Result;
use clap::Parser;

use seedsort::cli::{run_batch, run_inspect, run_predict, run_train, Cli, Commands};
use seedsort::utils::logging;

fn main() -> Result<()> {
    if let Err(e) = logging::init() {
        eprintln!("warning: {e}");
    }

    let cli = Cli::parse();
    match &cli.command {
        Commands::Train(args) => run_train(args),
        Commands::Predict(args) => run_predict(args),
        Commands::Batch(args) => run_batch(args),
        Commands::Inspect(args) => run_inspect(args),
    }
}
