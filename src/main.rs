//! # mzScope CLI
//!
//! Command-line front end for the mzScope viewport query engine and peak-map
//! renderer.
//!
//! ## Usage
//!
//! ```bash
//! # Render the full extent of a peak list
//! mzscope render --input peaks.tsv --output peaks.png
//!
//! # Zoom into a window, one partition only
//! mzscope render --input peaks.tsv --window 300,600,400,900 --partition -45
//!
//! # Inspect a peak list
//! mzscope info --input peaks.tsv
//!
//! # Exercise the full pipeline on synthetic data
//! mzscope demo --points 500000 --out-of-core
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    cli::init_logging(args.verbosity());
    cli::dispatch(args)
}
