use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mzscope::query::PeakSource;
use mzscope::render::{render_minimap, render_tile, Colormap, RenderConfig, RenderRequest};
use mzscope::table::{PeakRecord, PeakTable};
use mzscope::view::{ResolutionMode, ViewWindow};

/// Create a test table with known data spread over a 20-minute run
fn create_test_table(rows: usize) -> PeakTable {
    let records: Vec<PeakRecord> = (0..rows)
        .map(|i| {
            let rt = (i as f64 / rows as f64) * 1200.0;
            let mz = 300.0 + (i as f64 * 7.6493) % 1200.0;
            let intensity = ((i as f64 * 0.37).sin().abs() + 0.001) * 1.0e6;
            PeakRecord::with_cv(rt, mz, intensity, [-65.0, -55.0, -45.0][i % 3])
        })
        .collect();
    PeakTable::from_records(records).unwrap()
}

/// Full-bounds render request for a table at the configured plot size
fn full_request(table: &PeakTable, config: &RenderConfig, mode: ResolutionMode) -> RenderRequest {
    RenderRequest {
        window: ViewWindow {
            bounds: table.bounds(),
            mode,
            pixel_width: config.plot_width,
            pixel_height: config.plot_height,
        },
        colormap: Colormap::Jet,
        partition: None,
        generation: 1,
    }
}

/// Benchmark full-resolution tile rendering
fn bench_full_tile(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_tile");

    for rows in [10_000, 100_000, 400_000] {
        group.throughput(Throughput::Elements(rows as u64));

        let table = create_test_table(rows);
        let config = RenderConfig::default();
        let request = full_request(&table, &config, ResolutionMode::Full);

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}rows", rows)),
            &rows,
            |b, _| {
                b.iter(|| {
                    let tile = render_tile(&table, black_box(&request), &config).unwrap();
                    black_box(tile);
                });
            },
        );
    }

    group.finish();
}

/// Benchmark reduced-resolution tile rendering used during gestures
fn bench_fast_tile(c: &mut Criterion) {
    let mut group = c.benchmark_group("fast_tile");

    for rows in [10_000, 100_000, 400_000] {
        group.throughput(Throughput::Elements(rows as u64));

        let table = create_test_table(rows);
        let config = RenderConfig::default();
        let request = full_request(&table, &config, ResolutionMode::Fast);

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}rows", rows)),
            &rows,
            |b, _| {
                b.iter(|| {
                    let tile = render_tile(&table, black_box(&request), &config).unwrap();
                    black_box(tile);
                });
            },
        );
    }

    group.finish();
}

/// Benchmark minimap rendering with strided sampling
fn bench_minimap(c: &mut Criterion) {
    let mut group = c.benchmark_group("minimap");

    for rows in [100_000, 400_000] {
        let table = create_test_table(rows);
        let config = RenderConfig::default();

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}rows", rows)),
            &rows,
            |b, _| {
                b.iter(|| {
                    let tile = render_minimap(&table, Colormap::Jet, 1, &config).unwrap();
                    black_box(tile);
                });
            },
        );
    }

    group.finish();
}

/// Benchmark each palette over the same aggregation grid
fn bench_colormap_palettes(c: &mut Criterion) {
    let mut group = c.benchmark_group("colormap_palettes");

    let table = create_test_table(100_000);
    let config = RenderConfig::default();

    for colormap in Colormap::ALL {
        let mut request = full_request(&table, &config, ResolutionMode::Full);
        request.colormap = colormap;

        group.bench_with_input(
            BenchmarkId::from_parameter(colormap.name()),
            &colormap,
            |b, _| {
                b.iter(|| {
                    let tile = render_tile(&table, black_box(&request), &config).unwrap();
                    black_box(tile);
                });
            },
        );
    }

    group.finish();
}

/// Benchmark PNG encoding of a finished tile
fn bench_png_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("png_encode");

    let table = create_test_table(100_000);
    let config = RenderConfig::default();
    let request = full_request(&table, &config, ResolutionMode::Full);
    let tile = render_tile(&table, &request, &config).unwrap();

    group.throughput(Throughput::Elements(
        (tile.width as u64) * (tile.height as u64),
    ));

    group.bench_function("1100x550", |b| {
        b.iter(|| {
            let bytes = tile.to_png_bytes().unwrap();
            black_box(bytes);
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_full_tile,
    bench_fast_tile,
    bench_minimap,
    bench_colormap_palettes,
    bench_png_encode
);
criterion_main!(benches);
