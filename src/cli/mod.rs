use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cache;
mod config;
mod demo;
mod info;
mod render;

/// mzScope - Viewport Query Engine and Peak-Map Renderer
#[derive(Parser)]
#[command(name = "mzscope")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a peak-map tile from a TSV peak list
    Render(render::RenderArgs),

    /// Display summary information about a TSV peak list
    Info {
        /// Input TSV file with rt, mz and intensity columns
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,
    },

    /// Report or clear the disk cache
    Cache {
        /// Cache directory (defaults to mzscope-cache under the temp dir)
        #[arg(long, value_name = "DIR")]
        cache_dir: Option<PathBuf>,

        /// Report the total size of cached artifacts (default action)
        #[arg(long)]
        size: bool,

        /// Remove all cached artifacts
        #[arg(long, conflicts_with = "size")]
        clear: bool,
    },

    /// Generate synthetic LC-MS data and exercise the full pipeline
    Demo {
        /// Number of peaks to generate
        #[arg(short, long, value_name = "N", default_value = "400000")]
        points: usize,

        /// Directory for the generated TSV and PNG tiles
        #[arg(long, value_name = "DIR", default_value = "mzscope-demo")]
        out_dir: PathBuf,

        /// Route queries through the disk cache and verify parity
        #[arg(long)]
        out_of_core: bool,

        /// Load settings from a TOML config file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Render(args) => render::run(args),
        Commands::Info { input } => info::run(input),
        Commands::Cache {
            cache_dir,
            size: _,
            clear,
        } => cache::run(cache_dir, clear),
        Commands::Demo {
            points,
            out_dir,
            out_of_core,
            config,
        } => demo::run(points, out_dir, out_of_core, config),
    }
}
