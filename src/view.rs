//! # Viewport Controller
//!
//! Owns the view window over a peak map: current data-coordinate bounds,
//! resolution mode, and a bounded zoom history. Gestures (wheel zoom,
//! rectangle zoom, pan, minimap centering) are translated into window
//! transitions here; rendering consumes the resulting [`ViewWindow`] without
//! reading any ambient state.
//!
//! One `Viewport` instance per display panel. All gesture math happens in
//! plot-area pixels (no margins) with the y axis inverted: pixel y grows
//! downward while m/z grows upward.

use std::collections::VecDeque;

use crate::query::DataBounds;

/// Errors from viewport construction
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    /// Global data bounds are non-finite or inverted
    #[error("Invalid data bounds: rt [{rt_min}, {rt_max}], mz [{mz_min}, {mz_max}]")]
    InvalidBounds {
        /// Minimum retention time
        rt_min: f64,
        /// Maximum retention time
        rt_max: f64,
        /// Minimum m/z
        mz_min: f64,
        /// Maximum m/z
        mz_max: f64,
    },

    /// Plot area must have at least one pixel in each dimension
    #[error("Plot dimensions must be non-zero, got {width}x{height}")]
    ZeroPixelDimension {
        /// Requested width in pixels
        width: u32,
        /// Requested height in pixels
        height: u32,
    },
}

/// Rendering detail level, driven by interaction state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionMode {
    /// Nominal pixel dimensions with sparse-visibility enhancement
    Full,
    /// Reduced grid during active gestures, cheaper to aggregate
    Fast,
}

impl ResolutionMode {
    /// True for the reduced-detail interactive mode
    pub fn is_fast(&self) -> bool {
        matches!(self, ResolutionMode::Fast)
    }
}

/// Wheel direction for a zoom tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    /// Shrink the window (wheel up)
    In,
    /// Grow the window (wheel down)
    Out,
}

/// Everything a render call needs to know about the current view: the
/// data-coordinate window, the detail level, and the plot dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewWindow {
    /// Data-coordinate bounds of the visible region
    pub bounds: DataBounds,
    /// Detail level requested for this window
    pub mode: ResolutionMode,
    /// Plot area width in pixels
    pub pixel_width: u32,
    /// Plot area height in pixels
    pub pixel_height: u32,
}

/// Bidirectional mapping between data coordinates and plot-area pixels.
///
/// rt maps to the x axis, m/z to the y axis with inversion (the maximum m/z
/// sits at pixel row 0). Pixel inputs are clamped to the plot area before
/// conversion, matching how cursor events arriving near the border behave.
#[derive(Debug, Clone, Copy)]
pub struct ViewTransform {
    bounds: DataBounds,
    width: f64,
    height: f64,
}

impl ViewTransform {
    /// Build a transform for a window at the given plot dimensions
    pub fn new(bounds: DataBounds, pixel_width: u32, pixel_height: u32) -> Self {
        Self {
            bounds,
            width: pixel_width.max(1) as f64,
            height: pixel_height.max(1) as f64,
        }
    }

    /// Project a data point onto plot-area pixel coordinates
    pub fn data_to_pixel(&self, rt: f64, mz: f64) -> (f64, f64) {
        let rt_span = self.bounds.rt_span();
        let mz_span = self.bounds.mz_span();
        let fx = if rt_span > 0.0 {
            (rt - self.bounds.rt_min) / rt_span
        } else {
            0.0
        };
        let fy = if mz_span > 0.0 {
            (self.bounds.mz_max - mz) / mz_span
        } else {
            0.0
        };
        (fx * self.width, fy * self.height)
    }

    /// Convert a plot-area pixel position to data coordinates, clamping the
    /// pixel into the plot area first
    pub fn pixel_to_data(&self, px: f64, py: f64) -> (f64, f64) {
        let px = px.clamp(0.0, self.width);
        let py = py.clamp(0.0, self.height);
        let rt = self.bounds.rt_min + (px / self.width) * self.bounds.rt_span();
        let mz = self.bounds.mz_max - (py / self.height) * self.bounds.mz_span();
        (rt, mz)
    }
}

/// Tunable gesture parameters
#[derive(Debug, Clone)]
pub struct ViewOptions {
    /// Range multiplier per wheel tick zooming in
    pub wheel_in: f64,
    /// Range multiplier per wheel tick zooming out
    pub wheel_out: f64,
    /// Fraction of each range removed/added per side by the step buttons
    pub step_fraction: f64,
    /// Minimum rectangle-zoom drag extent per axis, in pixels
    pub min_drag_px: f64,
    /// Windows spanning at least this fraction of both global ranges are
    /// labelled "Full" in the zoom history
    pub full_label_fraction: f64,
    /// Maximum number of zoom history entries retained
    pub history_depth: usize,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            wheel_in: 0.7,
            wheel_out: 1.4,
            step_fraction: 0.1,
            min_drag_px: 10.0,
            full_label_fraction: 0.95,
            history_depth: 10,
        }
    }
}

/// One saved window with its navigation label
#[derive(Debug, Clone, PartialEq)]
pub struct ZoomEntry {
    /// The saved window bounds
    pub bounds: DataBounds,
    /// Human-readable label ("Full" or an rt range)
    pub label: String,
}

/// Bounded most-recent-last stack of saved windows.
///
/// Pushing beyond the depth evicts the oldest entry; pushing bounds equal to
/// the current last entry is skipped so repeated no-op gestures do not stack
/// duplicates.
#[derive(Debug, Clone)]
pub struct ZoomHistory {
    entries: VecDeque<ZoomEntry>,
    depth: usize,
}

impl ZoomHistory {
    /// Create an empty history retaining at most `depth` entries
    pub fn new(depth: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(depth),
            depth,
        }
    }

    /// Save an entry, skipping duplicates of the last and evicting from the
    /// front past the depth limit
    pub fn push(&mut self, entry: ZoomEntry) {
        if let Some(last) = self.entries.back() {
            if last.bounds == entry.bounds {
                return;
            }
        }
        self.entries.push_back(entry);
        while self.entries.len() > self.depth {
            self.entries.pop_front();
        }
    }

    /// Remove and return the most recent entry
    pub fn pop(&mut self) -> Option<ZoomEntry> {
        self.entries.pop_back()
    }

    /// Number of saved entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is saved
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries oldest-first
    pub fn iter(&self) -> impl Iterator<Item = &ZoomEntry> {
        self.entries.iter()
    }

    /// Labels oldest-first, for breadcrumb display
    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.label.as_str()).collect()
    }
}

/// View-window state machine for one display panel.
///
/// Holds the global data bounds (fixed at construction), the current window
/// (always a valid, clamped sub-rectangle), the resolution mode, and the zoom
/// history. Gesture methods return `bool` where a gesture can be rejected;
/// rejection always leaves the previous window in place.
#[derive(Debug, Clone)]
pub struct Viewport {
    data_bounds: DataBounds,
    window: DataBounds,
    mode: ResolutionMode,
    pixel_width: u32,
    pixel_height: u32,
    history: ZoomHistory,
    options: ViewOptions,
}

impl Viewport {
    /// Create a viewport showing the full data extent at `Full` detail
    pub fn new(
        data_bounds: DataBounds,
        pixel_width: u32,
        pixel_height: u32,
        options: ViewOptions,
    ) -> Result<Self, ViewError> {
        if !data_bounds.is_valid() {
            return Err(ViewError::InvalidBounds {
                rt_min: data_bounds.rt_min,
                rt_max: data_bounds.rt_max,
                mz_min: data_bounds.mz_min,
                mz_max: data_bounds.mz_max,
            });
        }
        if pixel_width == 0 || pixel_height == 0 {
            return Err(ViewError::ZeroPixelDimension {
                width: pixel_width,
                height: pixel_height,
            });
        }
        let history = ZoomHistory::new(options.history_depth);
        Ok(Self {
            data_bounds,
            window: data_bounds,
            mode: ResolutionMode::Full,
            pixel_width,
            pixel_height,
            history,
            options,
        })
    }

    /// Current window plus mode and dimensions, ready to hand to a render call
    pub fn window(&self) -> ViewWindow {
        ViewWindow {
            bounds: self.window,
            mode: self.mode,
            pixel_width: self.pixel_width,
            pixel_height: self.pixel_height,
        }
    }

    /// Current window bounds
    pub fn view_bounds(&self) -> DataBounds {
        self.window
    }

    /// Global data extent this viewport was created over
    pub fn data_bounds(&self) -> DataBounds {
        self.data_bounds
    }

    /// Current resolution mode
    pub fn mode(&self) -> ResolutionMode {
        self.mode
    }

    /// Pixel-space transform for the current window
    pub fn transform(&self) -> ViewTransform {
        ViewTransform::new(self.window, self.pixel_width, self.pixel_height)
    }

    /// Saved zoom history, oldest-first
    pub fn history(&self) -> &ZoomHistory {
        &self.history
    }

    /// True when the window shows less than the full data extent
    pub fn is_zoomed(&self) -> bool {
        self.window != self.data_bounds
    }

    /// Replace the window with explicit bounds, clamped to the data extent.
    ///
    /// Non-finite, inverted, degenerate, or fully-disjoint bounds are
    /// rejected and the previous window retained. Does not push history.
    pub fn set_window(&mut self, bounds: DataBounds) -> bool {
        if !bounds.is_valid() {
            log::debug!("Rejected view window {:?}: invalid bounds", bounds);
            return false;
        }
        let clamped = bounds.clamped_to(&self.data_bounds);
        if !clamped.is_valid() || clamped.is_degenerate() {
            log::debug!("Rejected view window {:?}: degenerate after clamping", bounds);
            return false;
        }
        self.window = clamped;
        true
    }

    /// Zoom one wheel tick anchored at the cursor.
    ///
    /// The cursor is given as fractions of the plot area (`0,0` top-left,
    /// y inverted); the data point under the cursor keeps its on-screen
    /// position. The result is clamped to the data extent and the prior
    /// window is pushed onto the history. Cursor fractions outside [0, 1]
    /// (events from the margins) are ignored.
    pub fn wheel_zoom(&mut self, x_frac: f64, y_frac: f64, direction: ZoomDirection) -> bool {
        if !(0.0..=1.0).contains(&x_frac) || !(0.0..=1.0).contains(&y_frac) {
            return false;
        }

        let factor = match direction {
            ZoomDirection::In => self.options.wheel_in,
            ZoomDirection::Out => self.options.wheel_out,
        };

        let rt_range = self.window.rt_span();
        let mz_range = self.window.mz_span();
        let new_rt_range = rt_range * factor;
        let new_mz_range = mz_range * factor;

        // Data point under the cursor, y inverted
        let rt_point = self.window.rt_min + x_frac * rt_range;
        let mz_point = self.window.mz_max - y_frac * mz_range;

        let candidate = DataBounds {
            rt_min: rt_point - x_frac * new_rt_range,
            rt_max: rt_point + (1.0 - x_frac) * new_rt_range,
            mz_min: mz_point - (1.0 - y_frac) * new_mz_range,
            mz_max: mz_point + y_frac * new_mz_range,
        }
        .clamped_to(&self.data_bounds);

        if !candidate.is_valid() || candidate.is_degenerate() {
            return false;
        }

        self.push_history();
        self.window = candidate;
        true
    }

    /// Zoom to a dragged rectangle given in plot-area pixels.
    ///
    /// Coordinates are clamped to the plot area; drags shorter than
    /// `min_drag_px` on either axis are rejected (accidental clicks must not
    /// produce near-degenerate windows). Pushes the prior window on success.
    pub fn zoom_rect(&mut self, x0: f64, y0: f64, x1: f64, y1: f64) -> bool {
        let w = self.pixel_width as f64;
        let h = self.pixel_height as f64;
        let (x0, y0) = (x0.clamp(0.0, w), y0.clamp(0.0, h));
        let (x1, y1) = (x1.clamp(0.0, w), y1.clamp(0.0, h));

        if (x1 - x0).abs() <= self.options.min_drag_px
            || (y1 - y0).abs() <= self.options.min_drag_px
        {
            log::debug!("Rectangle zoom below minimum drag distance, ignored");
            return false;
        }

        let x_lo = x0.min(x1) / w;
        let x_hi = x0.max(x1) / w;
        let y_lo = y0.min(y1) / h;
        let y_hi = y0.max(y1) / h;

        let rt_range = self.window.rt_span();
        let mz_range = self.window.mz_span();
        let candidate = DataBounds {
            rt_min: self.window.rt_min + x_lo * rt_range,
            rt_max: self.window.rt_min + x_hi * rt_range,
            // Top of the rectangle is the higher m/z
            mz_min: self.window.mz_max - y_hi * mz_range,
            mz_max: self.window.mz_max - y_lo * mz_range,
        };

        if !candidate.is_valid() || candidate.is_degenerate() {
            return false;
        }

        self.push_history();
        self.window = candidate;
        true
    }

    /// Translate the window by a drag delta in plot-area pixels.
    ///
    /// Dragging right moves the view toward lower rt (the data follows the
    /// cursor); dragging down moves it toward higher m/z. Window size is
    /// preserved: hitting the data extent shifts the window back inside
    /// instead of shrinking it. Pans never push history.
    pub fn pan_pixels(&mut self, delta_x: f64, delta_y: f64) {
        let rt_shift = -(delta_x / self.pixel_width as f64) * self.window.rt_span();
        let mz_shift = (delta_y / self.pixel_height as f64) * self.window.mz_span();
        self.shift_window(rt_shift, mz_shift);
    }

    /// Translate the window by fractions of its current spans (arrow-button
    /// panning); positive rt pans right, positive mz pans up
    pub fn pan_fraction(&mut self, rt_frac: f64, mz_frac: f64) {
        let rt_shift = self.window.rt_span() * rt_frac;
        let mz_shift = self.window.mz_span() * mz_frac;
        self.shift_window(rt_shift, mz_shift);
    }

    /// Recenter the window on a position given as fractions of the global
    /// extent (minimap coordinates, y inverted), preserving the window size
    /// and clamp-shifting at the borders. Does not push history.
    pub fn center_on(&mut self, x_frac: f64, y_frac: f64) {
        let rt_click = self.data_bounds.rt_min + x_frac * self.data_bounds.rt_span();
        let mz_click = self.data_bounds.mz_max - y_frac * self.data_bounds.mz_span();

        let rt_half = self.window.rt_span() / 2.0;
        let mz_half = self.window.mz_span() / 2.0;
        let centered = DataBounds {
            rt_min: rt_click - rt_half,
            rt_max: rt_click + rt_half,
            mz_min: mz_click - mz_half,
            mz_max: mz_click + mz_half,
        };
        self.window = clamp_shift(&centered, &self.data_bounds);
    }

    /// Contract each range by `step_fraction` per side (default 10%).
    /// Step buttons do not push history.
    pub fn zoom_in_step(&mut self) {
        let rt_step = self.window.rt_span() * self.options.step_fraction;
        let mz_step = self.window.mz_span() * self.options.step_fraction;
        let candidate = DataBounds {
            rt_min: self.window.rt_min + rt_step,
            rt_max: self.window.rt_max - rt_step,
            mz_min: self.window.mz_min + mz_step,
            mz_max: self.window.mz_max - mz_step,
        };
        if candidate.is_valid() && !candidate.is_degenerate() {
            self.window = candidate;
        }
    }

    /// Expand each range by `step_fraction` per side, clamped to the data
    /// extent. Step buttons do not push history.
    pub fn zoom_out_step(&mut self) {
        let rt_step = self.window.rt_span() * self.options.step_fraction;
        let mz_step = self.window.mz_span() * self.options.step_fraction;
        self.window = DataBounds {
            rt_min: (self.window.rt_min - rt_step).max(self.data_bounds.rt_min),
            rt_max: (self.window.rt_max + rt_step).min(self.data_bounds.rt_max),
            mz_min: (self.window.mz_min - mz_step).max(self.data_bounds.mz_min),
            mz_max: (self.window.mz_max + mz_step).min(self.data_bounds.mz_max),
        };
    }

    /// Restore the full data extent, pushing the prior window
    pub fn reset(&mut self) {
        self.push_history();
        self.window = self.data_bounds;
    }

    /// Pop the most recent history entry and restore it. Returns `false`
    /// (and leaves the window unchanged) when the history is empty.
    pub fn back(&mut self) -> bool {
        match self.history.pop() {
            Some(entry) => {
                self.window = entry.bounds.clamped_to(&self.data_bounds);
                true
            }
            None => false,
        }
    }

    /// Mark the start of a continuous gesture; rendering drops to `Fast`
    pub fn begin_gesture(&mut self) {
        self.mode = ResolutionMode::Fast;
    }

    /// Mark the end of a continuous gesture; rendering returns to `Full`
    pub fn end_gesture(&mut self) {
        self.mode = ResolutionMode::Full;
    }

    fn push_history(&mut self) {
        let label = self.label_for(&self.window);
        self.history.push(ZoomEntry {
            bounds: self.window,
            label,
        });
    }

    fn label_for(&self, bounds: &DataBounds) -> String {
        let near_full_rt =
            bounds.rt_span() >= self.data_bounds.rt_span() * self.options.full_label_fraction;
        let near_full_mz =
            bounds.mz_span() >= self.data_bounds.mz_span() * self.options.full_label_fraction;
        if near_full_rt && near_full_mz {
            "Full".to_string()
        } else {
            format!("RT {:.0}-{:.0}", bounds.rt_min, bounds.rt_max)
        }
    }

    fn shift_window(&mut self, rt_shift: f64, mz_shift: f64) {
        let shifted = DataBounds {
            rt_min: self.window.rt_min + rt_shift,
            rt_max: self.window.rt_max + rt_shift,
            mz_min: self.window.mz_min + mz_shift,
            mz_max: self.window.mz_max + mz_shift,
        };
        self.window = clamp_shift(&shifted, &self.data_bounds);
    }
}

/// Move a window back inside `outer` without changing its size; a window
/// larger than `outer` on an axis collapses to that axis of `outer`.
fn clamp_shift(window: &DataBounds, outer: &DataBounds) -> DataBounds {
    let (mut rt_min, mut rt_max) = (window.rt_min, window.rt_max);
    if rt_min < outer.rt_min {
        let shift = outer.rt_min - rt_min;
        rt_min += shift;
        rt_max += shift;
    }
    if rt_max > outer.rt_max {
        let shift = rt_max - outer.rt_max;
        rt_min -= shift;
        rt_max -= shift;
    }

    let (mut mz_min, mut mz_max) = (window.mz_min, window.mz_max);
    if mz_min < outer.mz_min {
        let shift = outer.mz_min - mz_min;
        mz_min += shift;
        mz_max += shift;
    }
    if mz_max > outer.mz_max {
        let shift = mz_max - outer.mz_max;
        mz_min -= shift;
        mz_max -= shift;
    }

    DataBounds {
        rt_min: rt_min.max(outer.rt_min),
        rt_max: rt_max.min(outer.rt_max),
        mz_min: mz_min.max(outer.mz_min),
        mz_max: mz_max.min(outer.mz_max),
    }
}
