use anyhow::{Context, Result};
use log::info;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use mzscope::cache::{CachedTable, DiskCache};
use mzscope::downsample::downsample;
use mzscope::hittest::{nearest_peak, DEFAULT_SNAP_RADIUS_PX};
use mzscope::ingest::load_tsv;
use mzscope::query::{DataBounds, PeakSource};
use mzscope::render::{render_minimap, render_tile, RenderRequest, RenderTile};
use mzscope::scheduler::RenderScheduler;
use mzscope::table::PeakTable;
use mzscope::view::{ResolutionMode, Viewport, ZoomDirection};

use super::config::Config;

/// Compensation voltages cycled across the synthetic run
const DEMO_CVS: [f64; 3] = [-65.0, -55.0, -45.0];

/// Generate demo LC-MS data and run it through the whole pipeline
pub fn run(
    points: usize,
    out_dir: PathBuf,
    out_of_core: bool,
    config_path: Option<PathBuf>,
) -> Result<()> {
    info!("mzScope Pipeline Demo");
    info!("=====================");

    let file_config = match &config_path {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    // Write the synthetic run to a TSV first so the demo exercises the same
    // ingestion path as real data.
    let tsv_path = out_dir.join("demo_peaks.tsv");
    write_demo_tsv(&tsv_path, points)?;
    info!("Generated {} synthetic peaks: {}", points, tsv_path.display());

    let table = load_tsv(&tsv_path)?;
    info!("{}", table.summary());

    let memory = Arc::new(table);
    let cached = if out_of_core {
        let cache = DiskCache::new(Some(out_dir.join("cache")), file_config.cache_compression()?)?;
        Some(Arc::new(
            cache
                .register(&memory, &tsv_path)
                .context("Failed to materialize the cache artifact")?,
        ))
    } else {
        None
    };
    let source: Arc<dyn PeakSource + Send + Sync> = match &cached {
        Some(cached) => cached.clone(),
        None => memory.clone(),
    };
    info!(
        "Query source: {}",
        if cached.is_some() { "disk cache" } else { "memory" }
    );

    let config = file_config.render_config(None, None);
    let colormap = file_config.colormap(None)?;

    // Full-extent tile
    let mut viewport = Viewport::new(
        source.bounds(),
        config.plot_width,
        config.plot_height,
        file_config.view_options(),
    )?;
    let full = render_tile(
        source.as_ref(),
        &RenderRequest {
            window: viewport.window(),
            colormap,
            partition: None,
            generation: 1,
        },
        &config,
    )?;
    save(&full, &out_dir, "full.png")?;

    // The same extent at gesture-time detail
    let mut fast_window = viewport.window();
    fast_window.mode = ResolutionMode::Fast;
    let fast = render_tile(
        source.as_ref(),
        &RenderRequest {
            window: fast_window,
            colormap,
            partition: None,
            generation: 1,
        },
        &config,
    )?;
    save(&fast, &out_dir, "fast.png")?;

    // Strided overview
    let minimap = render_minimap(source.as_ref(), colormap, 1, &config)?;
    save(&minimap, &out_dir, "minimap.png")?;

    // Simulated wheel gesture through the scheduler: throttled interactive
    // submissions while zooming, then the settle render once it ends.
    let mut scheduler = RenderScheduler::new(source.clone(), config.clone())?;
    viewport.begin_gesture();
    for _ in 0..3 {
        viewport.wheel_zoom(0.5, 0.5, ZoomDirection::In);
        let _ = scheduler.submit_interactive(viewport.window(), colormap, None)?;
    }
    viewport.end_gesture();
    let settle_gen = scheduler.submit_settle(viewport.window(), colormap, None)?;
    let zoomed = scheduler
        .recv_tile_timeout(Duration::from_secs(30))
        .context("Timed out waiting for the settle render")?;
    scheduler.finish()?;
    info!(
        "Settle render after 3 zoom ticks: generation {} (latest issued {}), {} rows",
        zoomed.generation, settle_gen, zoomed.rows_aggregated
    );
    save(&zoomed, &out_dir, "zoomed.png")?;

    // One partition in isolation, over the full extent
    let partitions = source.partitions();
    if let Some(&cv) = partitions.first() {
        let full_window = Viewport::new(
            source.bounds(),
            config.plot_width,
            config.plot_height,
            file_config.view_options(),
        )?
        .window();
        let tile = render_tile(
            source.as_ref(),
            &RenderRequest {
                window: full_window,
                colormap,
                partition: Some(cv),
                generation: 1,
            },
            &config,
        )?;
        info!("Partition CV {} tile: {} rows", cv, tile.rows_aggregated);
        save(&tile, &out_dir, "partition.png")?;
    }

    // Downsample one chromatographic slice as a spectrum
    let bounds = source.bounds();
    let mid_rt = (bounds.rt_min + bounds.rt_max) / 2.0;
    let band = DataBounds::new(mid_rt - 2.0, mid_rt + 2.0, bounds.mz_min, bounds.mz_max);
    let slice = source.range_query(&band, None)?;
    if !slice.is_empty() {
        let mut order: Vec<usize> = (0..slice.len()).collect();
        order.sort_by(|&a, &b| slice.mz[a].total_cmp(&slice.mz[b]));
        let mz: Vec<f64> = order.iter().map(|&i| slice.mz[i]).collect();
        let intensity: Vec<f64> = order.iter().map(|&i| slice.intensity[i]).collect();
        let selected = downsample(&mz, &intensity, &file_config.downsample_config())?;
        info!(
            "Downsampled the {:.1}-{:.1} s slice: {} of {} points retained",
            band.rt_min,
            band.rt_max,
            selected.len(),
            slice.len()
        );
    }

    // Hit-test at the center of the zoomed window
    let view_rows = source.range_query(&viewport.view_bounds(), None)?;
    let cursor = (
        config.plot_width as f64 / 2.0,
        config.plot_height as f64 / 2.0,
    );
    match nearest_peak(cursor, &view_rows, &viewport.transform(), DEFAULT_SNAP_RADIUS_PX) {
        Some(hit) => info!(
            "Hit at plot center: rt {:.2} s, m/z {:.4}, intensity {:.0} ({:.1} px away)",
            hit.rt, hit.mz, hit.intensity, hit.distance_px
        ),
        None => info!(
            "No peak within {} px of the plot center",
            DEFAULT_SNAP_RADIUS_PX
        ),
    }

    if let Some(cached) = &cached {
        parity_check(&memory, cached, &viewport.view_bounds())?;
    }

    info!("Demo complete!");
    info!("  Tiles written to {}", out_dir.display());
    info!("    full.png      - full-extent peak map");
    info!("    fast.png      - gesture-time reduced detail");
    info!("    minimap.png   - strided overview");
    info!("    zoomed.png    - settle render after the wheel gesture");
    if !partitions.is_empty() {
        info!("    partition.png - single compensation voltage");
    }

    Ok(())
}

/// Compare memory and artifact query results over one window
fn parity_check(
    memory: &PeakTable,
    cached: &CachedTable,
    window: &DataBounds,
) -> Result<()> {
    let mem = memory.range_query(window, None)?;
    let disk = cached.range_query(window, None)?;
    if mem.len() != disk.len() || mem.source_index != disk.source_index || mem.rt != disk.rt {
        anyhow::bail!(
            "Cache parity check failed: {} rows in memory vs {} from the artifact",
            mem.len(),
            disk.len()
        );
    }
    info!("Cache parity check passed: {} rows identical", mem.len());
    Ok(())
}

fn save(tile: &RenderTile, dir: &Path, name: &str) -> Result<()> {
    let path = dir.join(name);
    tile.save_png(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!(
        "  Wrote {} ({}x{}, {} rows)",
        path.display(),
        tile.width,
        tile.height,
        tile.rows_aggregated
    );
    Ok(())
}

/// Write a deterministic LC-MS-shaped peak list: a fixed set of compounds
/// with gaussian elution profiles, three-isotope envelopes, and a FAIMS-style
/// compensation voltage per compound.
fn write_demo_tsv(path: &Path, points: usize) -> Result<()> {
    use std::io::Write;

    const RUN_SECONDS: f64 = 1200.0;
    const MZ_LO: f64 = 300.0;
    const MZ_HI: f64 = 1500.0;
    const COMPOUNDS: usize = 160;

    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut out = std::io::BufWriter::new(file);
    writeln!(out, "rt\tmz\tintensity\tcv")?;

    for i in 0..points {
        let compound = i % COMPOUNDS;
        let noise = |salt: f64| ((i as f64 + 1.0) * salt).sin();

        let center_rt = (compound as f64 + 0.5) / COMPOUNDS as f64 * RUN_SECONDS;
        let rt = (center_rt + noise(0.731) * 15.0).clamp(0.0, RUN_SECONDS);

        let base_mz = MZ_LO + (compound as f64 * 7.6493) % (MZ_HI - MZ_LO);
        let isotope = (i / COMPOUNDS) % 3;
        let mz = base_mz + isotope as f64 * 1.0033 + noise(0.113) * 0.002;

        let apex = 1.0e6 / (1.0 + isotope as f64);
        let off_center = (rt - center_rt) / 8.0;
        let intensity =
            (apex * (-off_center * off_center).exp() * (0.2 + noise(0.457).abs() * 0.8)).max(1.0);

        let cv = DEMO_CVS[compound % DEMO_CVS.len()];
        writeln!(out, "{:.3}\t{:.4}\t{:.1}\t{}", rt, mz, intensity, cv)?;
    }
    out.flush()?;

    Ok(())
}
