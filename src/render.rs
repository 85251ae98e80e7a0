//! # Adaptive Rendering Pipeline
//!
//! Turns a view window over a [`PeakSource`] into an RGBA tile: query the
//! rows in the window, aggregate them into a 2-D grid keeping the maximum
//! `log_intensity` per cell, map cell values linearly through a colormap, and
//! grow isolated cells so single peaks stay visible at low zoom.
//!
//! Full mode aggregates at the nominal pixel dimensions and applies the
//! sparse-visibility spread. Fast mode (active during gestures) aggregates on
//! a grid reduced by `fast_factor`, skips the spread, and nearest-upscales
//! back to the nominal size, trading sharpness for latency.
//!
//! Rendering is a pure function of (source snapshot, window, colormap,
//! partition): identical requests produce byte-identical tiles, which is what
//! makes stale-result suppression by generation id safe.

pub mod colormap;

pub use colormap::Colormap;

use std::io::Cursor;
use std::path::Path;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::query::{
    overview_stride, DataBounds, PeakSource, QueryError, RowSet, OVERVIEW_TARGET_ROWS,
};
use crate::view::{ResolutionMode, ViewWindow};

/// Errors from tile rendering and encoding
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The underlying query failed
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// PNG encoding or writing failed
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Pixel buffer does not match the tile dimensions
    #[error("Invalid tile buffer: {0}")]
    InvalidBuffer(String),
}

/// Rendering parameters, shared by every panel
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Nominal plot width in pixels
    pub plot_width: u32,
    /// Nominal plot height in pixels
    pub plot_height: u32,
    /// Linear grid reduction applied in fast mode
    pub fast_factor: u32,
    /// Spread while the fraction of occupied cells with an occupied
    /// 8-neighbor stays below this
    pub spread_threshold: f64,
    /// Maximum spread passes in full mode
    pub spread_max_px: u32,
    /// Minimap width in pixels
    pub minimap_width: u32,
    /// Minimap height in pixels
    pub minimap_height: u32,
    /// Maximum spread passes for the minimap
    pub minimap_spread_max_px: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            plot_width: 1100,
            plot_height: 550,
            fast_factor: 4,
            spread_threshold: 0.5,
            spread_max_px: 3,
            minimap_width: 400,
            minimap_height: 200,
            minimap_spread_max_px: 2,
        }
    }
}

/// One render order: a window, the palette, an optional partition filter,
/// and the generation id used for stale-result suppression
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderRequest {
    /// Window to rasterize (bounds, mode, pixel dimensions)
    pub window: ViewWindow,
    /// Palette for intensity shading
    pub colormap: Colormap,
    /// Restrict rendering to one compensation-voltage partition
    pub partition: Option<f64>,
    /// Generation id the resulting tile is tagged with
    pub generation: u64,
}

/// Rasterized output for exactly one window
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTile {
    /// Row-major RGBA8 pixels, `4 * width * height` bytes
    pub pixels: Vec<u8>,
    /// Tile width in pixels
    pub width: u32,
    /// Tile height in pixels
    pub height: u32,
    /// Resolution mode the tile was rendered at
    pub mode: ResolutionMode,
    /// Generation id copied from the request
    pub generation: u64,
    /// Number of rows aggregated into the tile; zero marks the empty tile
    pub rows_aggregated: u64,
}

impl RenderTile {
    /// True for the designated "no data in window" tile
    pub fn is_empty(&self) -> bool {
        self.rows_aggregated == 0
    }

    /// Encode the tile as PNG bytes
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, RenderError> {
        let img = self.to_image()?;
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
        Ok(bytes)
    }

    /// Write the tile as a PNG file
    pub fn save_png(&self, path: &Path) -> Result<(), RenderError> {
        let img = self.to_image()?;
        img.save(path)?;
        Ok(())
    }

    fn to_image(&self) -> Result<image::RgbaImage, RenderError> {
        image::RgbaImage::from_raw(self.width, self.height, self.pixels.clone()).ok_or_else(|| {
            RenderError::InvalidBuffer(format!(
                "{}x{} tile with {} bytes",
                self.width,
                self.height,
                self.pixels.len()
            ))
        })
    }
}

/// Render one tile for the requested window.
///
/// An empty query result is not an error: it yields a background-filled tile
/// of the nominal dimensions with `rows_aggregated == 0`, still tagged with
/// the request's generation.
pub fn render_tile<S>(
    source: &S,
    request: &RenderRequest,
    config: &RenderConfig,
) -> Result<RenderTile, RenderError>
where
    S: PeakSource + ?Sized,
{
    let window = &request.window;
    let out_w = window.pixel_width.max(1);
    let out_h = window.pixel_height.max(1);

    let factor = if window.mode.is_fast() {
        config.fast_factor.max(1)
    } else {
        1
    };
    let grid_w = (out_w / factor).max(1) as usize;
    let grid_h = (out_h / factor).max(1) as usize;

    let rows = source.range_query(&window.bounds, request.partition)?;
    if rows.is_empty() {
        return Ok(background_tile(
            out_w,
            out_h,
            window.mode,
            request.colormap,
            request.generation,
        ));
    }

    let mut grid = aggregate(&rows, &window.bounds, grid_w, grid_h);
    if !window.mode.is_fast() && config.spread_max_px > 0 {
        spread(
            &mut grid,
            grid_w,
            grid_h,
            config.spread_threshold,
            config.spread_max_px,
        );
    }

    let pixels = colorize(&grid, request.colormap);
    let pixels = if (grid_w as u32, grid_h as u32) == (out_w, out_h) {
        pixels
    } else {
        upscale_nearest(&pixels, grid_w, grid_h, out_w as usize, out_h as usize)
    };

    Ok(RenderTile {
        pixels,
        width: out_w,
        height: out_h,
        mode: window.mode,
        generation: request.generation,
        rows_aggregated: rows.len() as u64,
    })
}

/// Render the overview minimap: the full data extent at minimap dimensions,
/// fed from a strided sample of the table instead of a full scan.
pub fn render_minimap<S>(
    source: &S,
    colormap: Colormap,
    generation: u64,
    config: &RenderConfig,
) -> Result<RenderTile, RenderError>
where
    S: PeakSource + ?Sized,
{
    let w = config.minimap_width.max(1);
    let h = config.minimap_height.max(1);

    let stride = overview_stride(source.count(), OVERVIEW_TARGET_ROWS);
    let rows = source.sampled(stride)?;
    if rows.is_empty() {
        return Ok(background_tile(w, h, ResolutionMode::Full, colormap, generation));
    }

    let bounds = source.bounds();
    let mut grid = aggregate(&rows, &bounds, w as usize, h as usize);
    if config.minimap_spread_max_px > 0 {
        spread(
            &mut grid,
            w as usize,
            h as usize,
            config.spread_threshold,
            config.minimap_spread_max_px,
        );
    }

    Ok(RenderTile {
        pixels: colorize(&grid, colormap),
        width: w,
        height: h,
        mode: ResolutionMode::Full,
        generation,
        rows_aggregated: rows.len() as u64,
    })
}

fn background_tile(
    width: u32,
    height: u32,
    mode: ResolutionMode,
    colormap: Colormap,
    generation: u64,
) -> RenderTile {
    let [r, g, b] = colormap.background();
    let mut pixels = Vec::with_capacity((width * height * 4) as usize);
    for _ in 0..width * height {
        pixels.extend_from_slice(&[r, g, b, 255]);
    }
    RenderTile {
        pixels,
        width,
        height,
        mode,
        generation,
        rows_aggregated: 0,
    }
}

// Cells hold the maximum log_intensity of their rows; NEG_INFINITY marks
// an empty cell.
const EMPTY_CELL: f64 = f64::NEG_INFINITY;

#[inline]
fn cell_of(rt: f64, mz: f64, bounds: &DataBounds, width: usize, height: usize) -> usize {
    let fx = if bounds.rt_span() > 0.0 {
        (rt - bounds.rt_min) / bounds.rt_span()
    } else {
        0.0
    };
    // y inverted: the maximum m/z maps to row 0
    let fy = if bounds.mz_span() > 0.0 {
        (bounds.mz_max - mz) / bounds.mz_span()
    } else {
        0.0
    };
    let x = ((fx * width as f64) as usize).min(width - 1);
    let y = ((fy * height as f64) as usize).min(height - 1);
    y * width + x
}

#[cfg(not(feature = "parallel"))]
fn aggregate(rows: &RowSet, bounds: &DataBounds, width: usize, height: usize) -> Vec<f64> {
    let mut grid = vec![EMPTY_CELL; width * height];
    for i in 0..rows.len() {
        let cell = cell_of(rows.rt[i], rows.mz[i], bounds, width, height);
        if rows.log_intensity[i] > grid[cell] {
            grid[cell] = rows.log_intensity[i];
        }
    }
    grid
}

#[cfg(feature = "parallel")]
fn aggregate(rows: &RowSet, bounds: &DataBounds, width: usize, height: usize) -> Vec<f64> {
    (0..rows.len())
        .into_par_iter()
        .fold(
            || vec![EMPTY_CELL; width * height],
            |mut grid, i| {
                let cell = cell_of(rows.rt[i], rows.mz[i], bounds, width, height);
                if rows.log_intensity[i] > grid[cell] {
                    grid[cell] = rows.log_intensity[i];
                }
                grid
            },
        )
        .reduce(
            || vec![EMPTY_CELL; width * height],
            |mut left, right| {
                for (cell, value) in left.iter_mut().zip(right) {
                    if value > *cell {
                        *cell = value;
                    }
                }
                left
            },
        )
}

/// Fraction of occupied cells that have at least one occupied 8-neighbor;
/// 1.0 for an unoccupied grid so spreading terminates immediately
fn neighbor_density(grid: &[f64], width: usize, height: usize) -> f64 {
    let mut occupied = 0usize;
    let mut with_neighbor = 0usize;
    for y in 0..height {
        for x in 0..width {
            if grid[y * width + x] == EMPTY_CELL {
                continue;
            }
            occupied += 1;
            'search: for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let nx = x as i64 + dx;
                    let ny = y as i64 + dy;
                    if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                        continue;
                    }
                    if grid[ny as usize * width + nx as usize] != EMPTY_CELL {
                        with_neighbor += 1;
                        break 'search;
                    }
                }
            }
        }
    }
    if occupied == 0 {
        1.0
    } else {
        with_neighbor as f64 / occupied as f64
    }
}

fn dilate_max(grid: &[f64], width: usize, height: usize) -> Vec<f64> {
    let mut out = grid.to_vec();
    for y in 0..height {
        for x in 0..width {
            let mut best = grid[y * width + x];
            for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    let nx = x as i64 + dx;
                    let ny = y as i64 + dy;
                    if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                        continue;
                    }
                    let v = grid[ny as usize * width + nx as usize];
                    if v > best {
                        best = v;
                    }
                }
            }
            out[y * width + x] = best;
        }
    }
    out
}

/// Grow isolated cells one pixel at a time until they stop being isolated
/// (density reaches the threshold) or the pass budget runs out
fn spread(grid: &mut Vec<f64>, width: usize, height: usize, threshold: f64, max_passes: u32) {
    for _ in 0..max_passes {
        if neighbor_density(grid, width, height) >= threshold {
            break;
        }
        *grid = dilate_max(grid, width, height);
    }
}

/// Map cell values linearly between the occupied minimum and maximum onto
/// the colormap; empty cells take the background color. A grid with a single
/// distinct value shades at full ramp intensity.
fn colorize(grid: &[f64], colormap: Colormap) -> Vec<u8> {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &v in grid {
        if v != EMPTY_CELL {
            lo = lo.min(v);
            hi = hi.max(v);
        }
    }
    let span = hi - lo;

    let background = colormap.background();
    let mut pixels = Vec::with_capacity(grid.len() * 4);
    for &v in grid {
        let rgb = if v == EMPTY_CELL {
            background
        } else if span > 0.0 {
            colormap.sample((v - lo) / span)
        } else {
            colormap.sample(1.0)
        };
        pixels.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
    }
    pixels
}

fn upscale_nearest(
    pixels: &[u8],
    src_w: usize,
    src_h: usize,
    dst_w: usize,
    dst_h: usize,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(dst_w * dst_h * 4);
    for y in 0..dst_h {
        let sy = y * src_h / dst_h;
        for x in 0..dst_w {
            let sx = x * src_w / dst_w;
            let src = (sy * src_w + sx) * 4;
            out.extend_from_slice(&pixels[src..src + 4]);
        }
    }
    out
}
