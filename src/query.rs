//! # Query Contract
//!
//! The logical query interface shared by both physical peak stores: the
//! in-memory [`PeakTable`](crate::table::PeakTable) and the disk-backed
//! [`CachedTable`](crate::cache::CachedTable). Callers hold a
//! [`PeakSource`] and never branch on where the rows live.
//!
//! All queries are read-only and idempotent: the peak table is immutable
//! after ingest, so repeated identical queries return the same row set
//! regardless of backend.

use std::sync::Arc;

/// Errors that can occur while executing a query
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// I/O error (disk-backed sources only)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),

    /// Parquet error
    #[error("Parquet error: {0}")]
    ParquetError(#[from] parquet::errors::ParquetError),

    /// Column missing from a disk artifact
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// Artifact contents do not match the peak table contract
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// `sampled` called with a zero stride
    #[error("Sampling stride must be >= 1, got 0")]
    InvalidStride,
}

/// Rectangular region of data-coordinate space.
///
/// All four edges are inclusive: a point lying exactly on a boundary
/// coordinate is inside the bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataBounds {
    /// Lower retention time edge (seconds)
    pub rt_min: f64,
    /// Upper retention time edge (seconds)
    pub rt_max: f64,
    /// Lower m/z edge
    pub mz_min: f64,
    /// Upper m/z edge
    pub mz_max: f64,
}

impl DataBounds {
    /// Create bounds from the four edges
    pub fn new(rt_min: f64, rt_max: f64, mz_min: f64, mz_max: f64) -> Self {
        Self {
            rt_min,
            rt_max,
            mz_min,
            mz_max,
        }
    }

    /// Inclusive containment test
    pub fn contains(&self, rt: f64, mz: f64) -> bool {
        rt >= self.rt_min && rt <= self.rt_max && mz >= self.mz_min && mz <= self.mz_max
    }

    /// Width of the retention time range
    pub fn rt_span(&self) -> f64 {
        self.rt_max - self.rt_min
    }

    /// Height of the m/z range
    pub fn mz_span(&self) -> f64 {
        self.mz_max - self.mz_min
    }

    /// True when all edges are finite and `min <= max` on both axes
    pub fn is_valid(&self) -> bool {
        self.rt_min.is_finite()
            && self.rt_max.is_finite()
            && self.mz_min.is_finite()
            && self.mz_max.is_finite()
            && self.rt_min <= self.rt_max
            && self.mz_min <= self.mz_max
    }

    /// True when either axis has collapsed to zero width
    pub fn is_degenerate(&self) -> bool {
        self.rt_span() <= 0.0 || self.mz_span() <= 0.0
    }

    /// Intersect with an outer rectangle, clamping each edge
    pub fn clamped_to(&self, outer: &DataBounds) -> DataBounds {
        DataBounds {
            rt_min: self.rt_min.max(outer.rt_min),
            rt_max: self.rt_max.min(outer.rt_max),
            mz_min: self.mz_min.max(outer.mz_min),
            mz_max: self.mz_max.min(outer.mz_max),
        }
    }
}

/// Columnar result of a query.
///
/// Parallel vectors, one entry per matching row. `source_index` carries each
/// row's ingestion-order position in the underlying table; hit-testing uses
/// it as a stable tie-break key, and it survives round-trips through the disk
/// cache.
#[derive(Debug, Clone, Default)]
pub struct RowSet {
    /// Retention times (seconds)
    pub rt: Vec<f64>,
    /// Mass-to-charge ratios
    pub mz: Vec<f64>,
    /// Raw intensities
    pub intensity: Vec<f64>,
    /// ln(1 + intensity), precomputed at ingest
    pub log_intensity: Vec<f64>,
    /// Compensation voltages; `None` when the table has no partition column
    pub cv: Option<Vec<f64>>,
    /// Ingestion-order position of each row in the source table
    pub source_index: Vec<u64>,
}

impl RowSet {
    /// Create an empty row set, pre-sized and with a cv column when the
    /// source table carries one
    pub fn with_capacity(capacity: usize, with_cv: bool) -> Self {
        Self {
            rt: Vec::with_capacity(capacity),
            mz: Vec::with_capacity(capacity),
            intensity: Vec::with_capacity(capacity),
            log_intensity: Vec::with_capacity(capacity),
            cv: with_cv.then(|| Vec::with_capacity(capacity)),
            source_index: Vec::with_capacity(capacity),
        }
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rt.len()
    }

    /// True when no rows matched
    pub fn is_empty(&self) -> bool {
        self.rt.is_empty()
    }

    /// Append one row.
    ///
    /// `cv` is ignored when the set was created without a partition column.
    /// In a partitioned set a row lacking a value records NaN, which never
    /// compares equal to any partition filter.
    pub fn push(
        &mut self,
        rt: f64,
        mz: f64,
        intensity: f64,
        log_intensity: f64,
        cv: Option<f64>,
        source_index: u64,
    ) {
        self.rt.push(rt);
        self.mz.push(mz);
        self.intensity.push(intensity);
        self.log_intensity.push(log_intensity);
        if let Some(col) = self.cv.as_mut() {
            col.push(cv.unwrap_or(f64::NAN));
        }
        self.source_index.push(source_index);
    }
}

/// Query contract implemented by every physical peak store.
///
/// Object-safe so the render scheduler can hold an
/// `Arc<dyn PeakSource + Send + Sync>` without caring about the backend.
pub trait PeakSource {
    /// Rows inside `bounds` (inclusive edges), optionally restricted to an
    /// exact partition value. Rows without a partition value never match a
    /// partition filter.
    fn range_query(&self, bounds: &DataBounds, partition: Option<f64>)
        -> Result<RowSet, QueryError>;

    /// Global data bounds, computed once at ingest (or artifact open) and
    /// cached
    fn bounds(&self) -> DataBounds;

    /// Total row count
    fn count(&self) -> u64;

    /// Every Nth row by ingestion order (indices `0, stride, 2*stride, ...`),
    /// for coarse overview rendering without materializing the full table
    fn sampled(&self, stride: usize) -> Result<RowSet, QueryError>;

    /// Sorted unique partition values; empty when the table has no partition
    /// column
    fn partitions(&self) -> Vec<f64>;
}

// Arc-wrapped sources are sources too; the scheduler passes them to the
// worker thread this way.
impl<T: PeakSource + ?Sized> PeakSource for Arc<T> {
    fn range_query(
        &self,
        bounds: &DataBounds,
        partition: Option<f64>,
    ) -> Result<RowSet, QueryError> {
        (**self).range_query(bounds, partition)
    }

    fn bounds(&self) -> DataBounds {
        (**self).bounds()
    }

    fn count(&self) -> u64 {
        (**self).count()
    }

    fn sampled(&self, stride: usize) -> Result<RowSet, QueryError> {
        (**self).sampled(stride)
    }

    fn partitions(&self) -> Vec<f64> {
        (**self).partitions()
    }
}

/// Default target row count for overview (minimap) sampling; matches a
/// 400x200 minimap with one candidate row per pixel
pub const OVERVIEW_TARGET_ROWS: usize = 80_000;

/// Sampling stride that reduces `total` rows to roughly `target`.
///
/// Never less than 1, so small tables pass through unsampled.
pub fn overview_stride(total: u64, target: usize) -> usize {
    if target == 0 {
        return 1;
    }
    ((total / target as u64).max(1)) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_contains_is_inclusive() {
        let b = DataBounds::new(10.0, 20.0, 100.0, 200.0);
        assert!(b.contains(10.0, 100.0));
        assert!(b.contains(20.0, 200.0));
        assert!(b.contains(15.0, 150.0));
        assert!(!b.contains(9.999, 150.0));
        assert!(!b.contains(20.001, 150.0));
        assert!(!b.contains(15.0, 200.001));
    }

    #[test]
    fn test_bounds_validity() {
        assert!(DataBounds::new(0.0, 1.0, 0.0, 1.0).is_valid());
        assert!(!DataBounds::new(1.0, 0.0, 0.0, 1.0).is_valid());
        assert!(!DataBounds::new(f64::NAN, 1.0, 0.0, 1.0).is_valid());
        assert!(!DataBounds::new(0.0, f64::INFINITY, 0.0, 1.0).is_valid());

        // Zero-width windows are valid rectangles but degenerate views
        let flat = DataBounds::new(5.0, 5.0, 0.0, 1.0);
        assert!(flat.is_valid());
        assert!(flat.is_degenerate());
    }

    #[test]
    fn test_bounds_clamping() {
        let outer = DataBounds::new(0.0, 100.0, 50.0, 150.0);
        let inner = DataBounds::new(-10.0, 40.0, 60.0, 400.0).clamped_to(&outer);
        assert_eq!(inner, DataBounds::new(0.0, 40.0, 60.0, 150.0));
    }

    #[test]
    fn test_rowset_push_respects_cv_presence() {
        let mut with = RowSet::with_capacity(4, true);
        with.push(1.0, 2.0, 3.0, 1.38, Some(-45.0), 0);
        with.push(1.5, 2.5, 3.5, 1.50, None, 1);
        assert_eq!(with.len(), 2);
        let col = with.cv.as_ref().unwrap();
        assert_eq!(col[0], -45.0);
        assert!(col[1].is_nan());

        let mut without = RowSet::with_capacity(4, false);
        without.push(1.0, 2.0, 3.0, 1.38, Some(-45.0), 0);
        assert!(without.cv.is_none());
    }

    #[test]
    fn test_overview_stride() {
        assert_eq!(overview_stride(100, 80_000), 1);
        assert_eq!(overview_stride(80_000, 80_000), 1);
        assert_eq!(overview_stride(160_000, 80_000), 2);
        assert_eq!(overview_stride(10_000_000, 80_000), 125);
        assert_eq!(overview_stride(0, 80_000), 1);
    }
}
