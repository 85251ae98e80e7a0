//! Integration tests for mzScope
//!
//! These tests verify the full pipeline from TSV ingestion through viewport
//! gestures, background rendering, hit-testing, and the disk cache.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use mzscope::cache::{CacheCompression, DiskCache};
use mzscope::hittest::{nearest_peak, DEFAULT_SNAP_RADIUS_PX};
use mzscope::ingest::load_tsv;
use mzscope::query::{DataBounds, PeakSource};
use mzscope::render::{render_minimap, render_tile, Colormap, RenderConfig, RenderRequest};
use mzscope::scheduler::RenderScheduler;
use mzscope::view::{
    ResolutionMode, ViewOptions, ViewWindow, Viewport, ZoomDirection,
};
use tempfile::tempdir;

/// Write a deterministic partitioned peak list
fn write_peaks_tsv(dir: &Path, rows: usize) -> PathBuf {
    let path = dir.join("peaks.tsv");
    let mut data = String::from("rt\tmz\tintensity\tcv\n");
    for i in 0..rows {
        let rt = i as f64 * 0.5;
        let mz = 400.0 + (i % 100) as f64 * 5.0;
        let intensity = 100.0 + (i as f64 * 0.37).sin().abs() * 1.0e5;
        let cv = [-65.0, -55.0, -45.0][i % 3];
        data.push_str(&format!("{}\t{}\t{:.3}\t{}\n", rt, mz, intensity, cv));
    }
    fs::write(&path, data).unwrap();
    path
}

/// Test the complete TSV-to-PNG pipeline
#[test]
fn test_tsv_to_png_pipeline() {
    let dir = tempdir().unwrap();
    let tsv = write_peaks_tsv(dir.path(), 2000);

    let table = load_tsv(&tsv).unwrap();
    assert_eq!(table.count(), 2000);
    assert_eq!(table.partitions(), vec![-65.0, -55.0, -45.0]);

    let config = RenderConfig::default();
    let viewport = Viewport::new(table.bounds(), 220, 110, ViewOptions::default()).unwrap();
    let tile = render_tile(
        &table,
        &RenderRequest {
            window: viewport.window(),
            colormap: Colormap::Jet,
            partition: None,
            generation: 1,
        },
        &config,
    )
    .unwrap();

    assert_eq!((tile.width, tile.height), (220, 110));
    assert_eq!(tile.rows_aggregated, 2000);
    assert_eq!(tile.mode, ResolutionMode::Full);

    let png = dir.path().join("tile.png");
    tile.save_png(&png).unwrap();
    let bytes = fs::read(&png).unwrap();
    assert_eq!(&bytes[..4], &[0x89, b'P', b'N', b'G']);
}

/// Test that gestures drive the resolution mode and the zoom history
#[test]
fn test_gestures_drive_mode_and_history() {
    let bounds = DataBounds::new(0.0, 1000.0, 100.0, 1100.0);
    let mut viewport = Viewport::new(bounds, 1000, 500, ViewOptions::default()).unwrap();
    assert_eq!(viewport.mode(), ResolutionMode::Full);
    assert!(!viewport.is_zoomed());

    // Wheel zoom during a gesture: fast mode, history gains the prior window
    viewport.begin_gesture();
    assert_eq!(viewport.mode(), ResolutionMode::Fast);
    assert!(viewport.wheel_zoom(0.5, 0.5, ZoomDirection::In));
    viewport.end_gesture();
    assert_eq!(viewport.mode(), ResolutionMode::Full);
    assert!(viewport.is_zoomed());
    assert_eq!(viewport.history().len(), 1);
    assert_eq!(viewport.history().labels(), vec!["Full"]);

    // Rectangle zoom narrows further and pushes again
    let before = viewport.view_bounds();
    assert!(viewport.zoom_rect(100.0, 50.0, 600.0, 400.0));
    assert_eq!(viewport.history().len(), 2);
    let after = viewport.view_bounds();
    assert!(after.rt_span() < before.rt_span());
    assert!(after.mz_span() < before.mz_span());

    // Panning moves the window without touching history
    let panned_from = viewport.view_bounds();
    viewport.pan_fraction(0.1, 0.0);
    assert!(viewport.view_bounds().rt_min > panned_from.rt_min);
    assert_eq!(viewport.history().len(), 2);

    // Back restores the rectangle-zoom origin
    assert!(viewport.back());
    assert_eq!(viewport.view_bounds(), before);
    assert_eq!(viewport.history().len(), 1);

    // Reset returns to the full extent
    viewport.reset();
    assert_eq!(viewport.view_bounds(), bounds);
}

/// Test that the history depth is capped with oldest-first eviction
#[test]
fn test_history_cap_evicts_oldest() {
    let bounds = DataBounds::new(0.0, 1000.0, 100.0, 1100.0);
    let mut viewport = Viewport::new(bounds, 1000, 500, ViewOptions::default()).unwrap();

    for _ in 0..14 {
        assert!(viewport.wheel_zoom(0.5, 0.5, ZoomDirection::In));
    }
    assert_eq!(viewport.history().len(), 10);

    // The full-extent entry was evicted; every surviving label names a range
    assert!(viewport.history().labels().iter().all(|l| *l != "Full"));
}

/// Test the background scheduler against a direct render of the same window
#[test]
fn test_scheduler_settle_matches_direct_render() {
    let dir = tempdir().unwrap();
    let tsv = write_peaks_tsv(dir.path(), 600);
    let table = Arc::new(load_tsv(&tsv).unwrap());

    let config = RenderConfig::default();
    let mut viewport = Viewport::new(table.bounds(), 64, 32, ViewOptions::default()).unwrap();
    let mut scheduler = RenderScheduler::new(table.clone(), config.clone())
        .unwrap()
        .with_throttle(Duration::ZERO);

    viewport.begin_gesture();
    assert!(viewport.wheel_zoom(0.3, 0.6, ZoomDirection::In));
    scheduler
        .submit_interactive(viewport.window(), Colormap::Viridis, None)
        .unwrap();
    viewport.end_gesture();

    let generation = scheduler
        .submit_settle(viewport.window(), Colormap::Viridis, None)
        .unwrap();
    let tile = scheduler
        .recv_tile_timeout(Duration::from_secs(10))
        .expect("settle tile arrives");
    assert_eq!(tile.generation, generation);
    assert_eq!(tile.mode, ResolutionMode::Full);
    scheduler.finish().unwrap();

    let direct = render_tile(
        table.as_ref(),
        &RenderRequest {
            window: viewport.window(),
            colormap: Colormap::Viridis,
            partition: None,
            generation,
        },
        &config,
    )
    .unwrap();
    assert_eq!(tile, direct);
}

/// Test that a disk-cached table answers exactly like the in-memory table
#[test]
fn test_out_of_core_matches_memory() {
    let dir = tempdir().unwrap();
    let tsv = write_peaks_tsv(dir.path(), 1500);
    let table = load_tsv(&tsv).unwrap();

    let cache = DiskCache::new(
        Some(dir.path().join("cache")),
        CacheCompression::default(),
    )
    .unwrap();
    let cached = cache.register(&table, &tsv).unwrap();

    assert_eq!(cached.count(), table.count());
    assert_eq!(cached.bounds(), table.bounds());
    assert_eq!(cached.partitions(), table.partitions());

    let probe = DataBounds::new(100.0, 500.0, 500.0, 800.0);
    for partition in [None, Some(-45.0), Some(-55.0)] {
        let mem = table.range_query(&probe, partition).unwrap();
        let disk = cached.range_query(&probe, partition).unwrap();
        assert_eq!(mem.source_index, disk.source_index);
        assert_eq!(mem.rt, disk.rt);
        assert_eq!(mem.mz, disk.mz);
        assert_eq!(mem.log_intensity, disk.log_intensity);
    }

    let mem_sample = table.sampled(37).unwrap();
    let disk_sample = cached.sampled(37).unwrap();
    assert_eq!(mem_sample.source_index, disk_sample.source_index);

    // Registering the unchanged source reuses the artifact
    let again = cache.register(&table, &tsv).unwrap();
    assert_eq!(again.path(), cached.path());
}

/// Test that a changed source file produces a fresh artifact
#[test]
fn test_changed_source_gets_new_artifact() {
    let dir = tempdir().unwrap();
    let tsv = write_peaks_tsv(dir.path(), 300);
    let table = load_tsv(&tsv).unwrap();

    let cache = DiskCache::new(
        Some(dir.path().join("cache")),
        CacheCompression::default(),
    )
    .unwrap();
    let first = cache.register(&table, &tsv).unwrap();

    // Rewrite with an extra row: size (and content) change the cache key
    let mut data = fs::read_to_string(&tsv).unwrap();
    data.push_str("999.0\t450.0\t77.0\t-45\n");
    fs::write(&tsv, data).unwrap();
    let table = load_tsv(&tsv).unwrap();

    let second = cache.register(&table, &tsv).unwrap();
    assert_ne!(first.path(), second.path());
    assert_eq!(second.count(), 301);
}

/// Test hit-testing against rows queried for the current viewport
#[test]
fn test_hit_test_on_viewport_rows() {
    let dir = tempdir().unwrap();
    let tsv = write_peaks_tsv(dir.path(), 400);
    let table = load_tsv(&tsv).unwrap();

    let viewport = Viewport::new(table.bounds(), 800, 400, ViewOptions::default()).unwrap();
    let transform = viewport.transform();
    let rows = table.range_query(&viewport.view_bounds(), None).unwrap();
    assert_eq!(rows.len(), 400);

    // Aim exactly at a known row and expect that row back
    let (px, py) = transform.data_to_pixel(rows.rt[123], rows.mz[123]);
    let hit = nearest_peak((px, py), &rows, &transform, DEFAULT_SNAP_RADIUS_PX)
        .expect("cursor directly over a peak");
    assert_eq!(hit.source_index, rows.source_index[123]);
    assert_eq!(hit.rt, rows.rt[123]);
    assert_eq!(hit.mz, rows.mz[123]);
    assert!(hit.distance_px < 1e-9);
}

/// Test that a window with no data yields the designated empty tile
#[test]
fn test_empty_region_yields_background_tile() {
    let dir = tempdir().unwrap();
    let tsv = write_peaks_tsv(dir.path(), 50);
    let table = load_tsv(&tsv).unwrap();

    // Rows sit in rt [0, 24.5]; probe far outside it
    let window = ViewWindow {
        bounds: DataBounds::new(5000.0, 6000.0, 400.0, 900.0),
        mode: ResolutionMode::Full,
        pixel_width: 12,
        pixel_height: 8,
    };
    let tile = render_tile(
        &table,
        &RenderRequest {
            window,
            colormap: Colormap::Fire,
            partition: None,
            generation: 9,
        },
        &RenderConfig::default(),
    )
    .unwrap();

    assert!(tile.is_empty());
    assert_eq!(tile.generation, 9);
    assert_eq!((tile.width, tile.height), (12, 8));
    let bg = Colormap::Fire.background();
    assert_eq!(&tile.pixels[..4], &[bg[0], bg[1], bg[2], 255]);
}

/// Test the minimap path over a cached table
#[test]
fn test_minimap_from_cached_table() {
    let dir = tempdir().unwrap();
    let tsv = write_peaks_tsv(dir.path(), 1000);
    let table = load_tsv(&tsv).unwrap();

    let cache = DiskCache::new(
        Some(dir.path().join("cache")),
        CacheCompression::Zstd(3),
    )
    .unwrap();
    let cached = cache.register(&table, &tsv).unwrap();

    let config = RenderConfig {
        minimap_width: 80,
        minimap_height: 40,
        ..RenderConfig::default()
    };
    let from_memory = render_minimap(&table, Colormap::Jet, 5, &config).unwrap();
    let from_disk = render_minimap(&cached, Colormap::Jet, 5, &config).unwrap();

    assert_eq!(from_memory, from_disk);
    assert_eq!(from_disk.rows_aggregated, 1000);
}
