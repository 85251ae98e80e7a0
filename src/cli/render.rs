use anyhow::{Context, Result};
use clap::Args;
use log::info;
use std::path::PathBuf;

use mzscope::cache::{DiskCache, TableHandle};
use mzscope::ingest::load_tsv;
use mzscope::query::{DataBounds, PeakSource};
use mzscope::render::{render_tile, Colormap, RenderRequest};
use mzscope::view::{ResolutionMode, Viewport};

use super::config::Config;

/// Arguments for the render subcommand
#[derive(Args)]
pub struct RenderArgs {
    /// Input TSV file with rt, mz and intensity columns
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Output PNG path
    #[arg(short, long, value_name = "FILE", default_value = "tile.png")]
    pub output: PathBuf,

    /// Data window as rt_min,rt_max,mz_min,mz_max (defaults to the full extent)
    #[arg(short, long, value_name = "RT0,RT1,MZ0,MZ1")]
    pub window: Option<String>,

    /// Palette: jet, hot, fire, viridis, plasma, inferno or magma
    #[arg(long, value_name = "NAME")]
    pub colormap: Option<Colormap>,

    /// Render at the reduced detail level used during gestures
    #[arg(long)]
    pub fast: bool,

    /// Restrict rendering to one compensation-voltage partition
    #[arg(long, value_name = "CV")]
    pub partition: Option<f64>,

    /// Plot width in pixels
    #[arg(long, value_name = "PX")]
    pub width: Option<u32>,

    /// Plot height in pixels
    #[arg(long, value_name = "PX")]
    pub height: Option<u32>,

    /// Query through a disk-cached Parquet artifact instead of memory
    #[arg(long)]
    pub out_of_core: bool,

    /// Cache directory (defaults to mzscope-cache under the temp dir)
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Load settings from a TOML config file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Render one tile from a TSV peak list
pub fn run(args: RenderArgs) -> Result<()> {
    if !args.input.exists() {
        anyhow::bail!("Input file does not exist: {}", args.input.display());
    }

    let file_config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let render_config = file_config.render_config(args.width, args.height);
    let colormap = file_config.colormap(args.colormap)?;

    info!("mzScope Renderer");
    info!("================");
    info!("Input:  {}", args.input.display());
    info!("Output: {}", args.output.display());

    let table = load_tsv(&args.input)
        .with_context(|| format!("Failed to load {}", args.input.display()))?;
    info!("{}", table.summary());

    if let Some(p) = args.partition {
        let partitions = table.partitions();
        if !partitions.contains(&p) {
            anyhow::bail!(
                "Partition {} not present in the data (available: {:?})",
                p,
                partitions
            );
        }
    }

    let handle = if args.out_of_core {
        let cache_dir = args.cache_dir.clone().or_else(|| file_config.cache.dir.clone());
        let cache = DiskCache::new(cache_dir, file_config.cache_compression()?)?;
        TableHandle::open_with_cache(table, &cache, &args.input)
    } else {
        TableHandle::in_memory(table)
    };
    info!(
        "Query source: {}",
        if handle.is_cached() { "disk cache" } else { "memory" }
    );

    let source = handle.source();
    let mut viewport = Viewport::new(
        source.bounds(),
        render_config.plot_width,
        render_config.plot_height,
        file_config.view_options(),
    )?;
    if let Some(spec) = &args.window {
        let bounds = parse_window(spec).map_err(|e| anyhow::anyhow!(e))?;
        if !viewport.set_window(bounds) {
            anyhow::bail!("Window '{}' does not intersect the data extent", spec);
        }
    }

    let mut window = viewport.window();
    if args.fast {
        window.mode = ResolutionMode::Fast;
    }

    let request = RenderRequest {
        window,
        colormap,
        partition: args.partition,
        generation: 1,
    };
    let tile = render_tile(source.as_ref(), &request, &render_config)?;
    tile.save_png(&args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    let file_size = std::fs::metadata(&args.output).map(|m| m.len()).unwrap_or(0);
    info!("Render complete!");
    info!("  Rows aggregated: {}", tile.rows_aggregated);
    info!(
        "  Tile: {}x{} px, {:?} mode, {} palette",
        tile.width, tile.height, tile.mode, colormap
    );
    info!("  PNG size: {} bytes ({:.2} KB)", file_size, file_size as f64 / 1024.0);
    if tile.is_empty() {
        info!("  Window contained no peaks; wrote the background tile");
    }

    Ok(())
}

/// Parse a `rt_min,rt_max,mz_min,mz_max` window specification
fn parse_window(spec: &str) -> Result<DataBounds, String> {
    let parts: Vec<&str> = spec.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        return Err(format!(
            "Expected rt_min,rt_max,mz_min,mz_max (four comma-separated values), got '{}'",
            spec
        ));
    }
    let mut edges = [0.0f64; 4];
    for (slot, part) in edges.iter_mut().zip(&parts) {
        *slot = part
            .parse()
            .map_err(|_| format!("Cannot parse window edge '{}'", part))?;
    }
    let bounds = DataBounds::new(edges[0], edges[1], edges[2], edges[3]);
    if !bounds.is_valid() {
        return Err(format!("Window edges out of order in '{}'", spec));
    }
    Ok(bounds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_window_accepts_spaces() {
        let bounds = parse_window("10, 20, 400.5, 900").unwrap();
        assert_eq!(bounds.rt_min, 10.0);
        assert_eq!(bounds.rt_max, 20.0);
        assert_eq!(bounds.mz_min, 400.5);
        assert_eq!(bounds.mz_max, 900.0);
    }

    #[test]
    fn test_parse_window_rejects_wrong_arity() {
        assert!(parse_window("10,20,400").is_err());
        assert!(parse_window("10,20,400,900,1").is_err());
    }

    #[test]
    fn test_parse_window_rejects_bad_number() {
        let err = parse_window("10,twenty,400,900").unwrap_err();
        assert!(err.contains("twenty"));
    }

    #[test]
    fn test_parse_window_rejects_inverted_edges() {
        assert!(parse_window("20,10,400,900").is_err());
        assert!(parse_window("10,20,900,400").is_err());
    }
}
