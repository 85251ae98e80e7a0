//! # Hit-Testing
//!
//! Nearest-peak lookup in screen space for hover and click. Candidates are
//! the rows already filtered to the viewport, so a scan is proportional to
//! what is on screen, never to the full table.

use crate::query::RowSet;
use crate::view::ViewTransform;

/// Default snap radius in pixels; cursor positions further than this from
/// every candidate report no match
pub const DEFAULT_SNAP_RADIUS_PX: f64 = 15.0;

/// The peak nearest to the cursor, with its screen distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakHit {
    /// Position of the hit within the candidate row set
    pub row: usize,
    /// Ingestion-order index of the hit in the source table
    pub source_index: u64,
    /// Retention time of the hit
    pub rt: f64,
    /// m/z of the hit
    pub mz: f64,
    /// Raw intensity of the hit
    pub intensity: f64,
    /// Euclidean cursor distance in pixels
    pub distance_px: f64,
}

/// Find the candidate nearest to `cursor_px`, if any lies within `snap_px`.
///
/// Distance is Euclidean in plot-area pixel space after projecting each
/// candidate through `transform`. Equidistant candidates resolve to the one
/// with the lowest `source_index`. An empty candidate set returns `None`.
pub fn nearest_peak(
    cursor_px: (f64, f64),
    rows: &RowSet,
    transform: &ViewTransform,
    snap_px: f64,
) -> Option<PeakHit> {
    let snap_sq = snap_px * snap_px;
    let mut best: Option<(usize, f64)> = None;

    for i in 0..rows.len() {
        let (px, py) = transform.data_to_pixel(rows.rt[i], rows.mz[i]);
        let dx = px - cursor_px.0;
        let dy = py - cursor_px.1;
        let dist_sq = dx * dx + dy * dy;
        if dist_sq > snap_sq {
            continue;
        }
        let closer = match best {
            None => true,
            Some((best_i, best_sq)) => {
                dist_sq < best_sq
                    || (dist_sq == best_sq && rows.source_index[i] < rows.source_index[best_i])
            }
        };
        if closer {
            best = Some((i, dist_sq));
        }
    }

    best.map(|(i, dist_sq)| PeakHit {
        row: i,
        source_index: rows.source_index[i],
        rt: rows.rt[i],
        mz: rows.mz[i],
        intensity: rows.intensity[i],
        distance_px: dist_sq.sqrt(),
    })
}
