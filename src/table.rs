//! # In-Memory Peak Table
//!
//! The primary physical store for ingested peaks: parallel `Vec<f64>` columns
//! plus bounds and partition values computed once at construction. Immutable
//! after ingest; every query materializes a new [`RowSet`] and never touches
//! the stored columns.
//!
//! For datasets that exceed memory, the same rows can be registered with a
//! [`DiskCache`](crate::cache::DiskCache), which exposes the identical
//! [`PeakSource`] contract from a compressed Parquet artifact.

use std::fmt;

use crate::query::{overview_stride, DataBounds, PeakSource, QueryError, RowSet, OVERVIEW_TARGET_ROWS};

/// Errors that can occur while building a peak table
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// No rows were supplied; a table must have data bounds
    #[error("Cannot build a peak table from zero rows")]
    Empty,

    /// A coordinate or intensity was NaN or infinite
    #[error("Non-finite {column} in row {row}")]
    NonFinite {
        /// Offending column name
        column: &'static str,
        /// Zero-based row index in ingestion order
        row: usize,
    },

    /// Intensity below zero cannot be log-transformed
    #[error("Negative intensity {value} in row {row}")]
    NegativeIntensity {
        /// The rejected value
        value: f64,
        /// Zero-based row index in ingestion order
        row: usize,
    },
}

/// One peak row as delivered by a loader.
///
/// `log_intensity` is not part of the ingestion contract; the table derives
/// it once at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakRecord {
    /// Retention time in seconds
    pub rt: f64,
    /// Mass-to-charge ratio
    pub mz: f64,
    /// Signal intensity
    pub intensity: f64,
    /// Compensation voltage, when the run was FAIMS-partitioned
    pub cv: Option<f64>,
}

impl PeakRecord {
    /// Record without a partition value
    pub fn new(rt: f64, mz: f64, intensity: f64) -> Self {
        Self {
            rt,
            mz,
            intensity,
            cv: None,
        }
    }

    /// Record carrying a compensation voltage
    pub fn with_cv(rt: f64, mz: f64, intensity: f64, cv: f64) -> Self {
        Self {
            rt,
            mz,
            intensity,
            cv: Some(cv),
        }
    }
}

/// Immutable columnar store of ingested peaks.
pub struct PeakTable {
    rt: Vec<f64>,
    mz: Vec<f64>,
    intensity: Vec<f64>,
    log_intensity: Vec<f64>,
    cv: Option<Vec<f64>>,
    bounds: DataBounds,
    partitions: Vec<f64>,
}

impl PeakTable {
    /// Build a table from loader records.
    ///
    /// Derives `log_intensity = ln(1 + intensity)` per row, computes global
    /// bounds, and collects sorted unique partition values. The partition
    /// column exists as soon as any record carries one; records without a
    /// value store NaN there (excluded from every partition filter).
    pub fn from_records(
        records: impl IntoIterator<Item = PeakRecord>,
    ) -> Result<Self, TableError> {
        let mut rt = Vec::new();
        let mut mz = Vec::new();
        let mut intensity = Vec::new();
        let mut log_intensity = Vec::new();
        let mut cv: Option<Vec<f64>> = None;

        for (row, record) in records.into_iter().enumerate() {
            if !record.rt.is_finite() {
                return Err(TableError::NonFinite { column: "rt", row });
            }
            if !record.mz.is_finite() {
                return Err(TableError::NonFinite { column: "mz", row });
            }
            if !record.intensity.is_finite() {
                return Err(TableError::NonFinite {
                    column: "intensity",
                    row,
                });
            }
            if record.intensity < 0.0 {
                return Err(TableError::NegativeIntensity {
                    value: record.intensity,
                    row,
                });
            }

            rt.push(record.rt);
            mz.push(record.mz);
            intensity.push(record.intensity);
            log_intensity.push(record.intensity.ln_1p());

            match (&mut cv, record.cv) {
                (Some(col), value) => col.push(value.unwrap_or(f64::NAN)),
                (None, Some(value)) => {
                    // First partitioned record; backfill earlier rows as unpartitioned
                    let mut col = vec![f64::NAN; row];
                    col.push(value);
                    cv = Some(col);
                }
                (None, None) => {}
            }
        }

        if rt.is_empty() {
            return Err(TableError::Empty);
        }

        let bounds = compute_bounds(&rt, &mz);
        let partitions = collect_partitions(cv.as_deref());

        Ok(Self {
            rt,
            mz,
            intensity,
            log_intensity,
            cv,
            bounds,
            partitions,
        })
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rt.len()
    }

    /// True for a table with no rows; unreachable through `from_records`
    pub fn is_empty(&self) -> bool {
        self.rt.is_empty()
    }

    /// True when the table carries a partition column
    pub fn has_partition(&self) -> bool {
        self.cv.is_some()
    }

    /// Retention time column
    pub fn rt(&self) -> &[f64] {
        &self.rt
    }

    /// m/z column
    pub fn mz(&self) -> &[f64] {
        &self.mz
    }

    /// Intensity column
    pub fn intensity(&self) -> &[f64] {
        &self.intensity
    }

    /// Derived log-intensity column
    pub fn log_intensity(&self) -> &[f64] {
        &self.log_intensity
    }

    /// Partition column, when present
    pub fn cv(&self) -> Option<&[f64]> {
        self.cv.as_deref()
    }

    /// Summary statistics for logging and the `info` command
    pub fn summary(&self) -> TableSummary {
        TableSummary {
            rows: self.count(),
            bounds: self.bounds,
            partitions: self.partitions.clone(),
            overview_stride: overview_stride(self.count(), OVERVIEW_TARGET_ROWS),
        }
    }
}

impl PeakSource for PeakTable {
    fn range_query(
        &self,
        bounds: &DataBounds,
        partition: Option<f64>,
    ) -> Result<RowSet, QueryError> {
        let mut rows = RowSet::with_capacity(0, self.cv.is_some());

        for i in 0..self.len() {
            if !bounds.contains(self.rt[i], self.mz[i]) {
                continue;
            }
            if let Some(p) = partition {
                // NaN entries (rows without a value) never match
                match self.cv.as_deref() {
                    Some(col) if col[i] == p => {}
                    _ => continue,
                }
            }
            rows.push(
                self.rt[i],
                self.mz[i],
                self.intensity[i],
                self.log_intensity[i],
                self.cv.as_deref().map(|col| col[i]),
                i as u64,
            );
        }

        Ok(rows)
    }

    fn bounds(&self) -> DataBounds {
        self.bounds
    }

    fn count(&self) -> u64 {
        self.rt.len() as u64
    }

    fn sampled(&self, stride: usize) -> Result<RowSet, QueryError> {
        if stride == 0 {
            return Err(QueryError::InvalidStride);
        }

        let capacity = self.len() / stride + 1;
        let mut rows = RowSet::with_capacity(capacity, self.cv.is_some());

        for i in (0..self.len()).step_by(stride) {
            rows.push(
                self.rt[i],
                self.mz[i],
                self.intensity[i],
                self.log_intensity[i],
                self.cv.as_deref().map(|col| col[i]),
                i as u64,
            );
        }

        Ok(rows)
    }

    fn partitions(&self) -> Vec<f64> {
        self.partitions.clone()
    }
}

/// Summary statistics about a peak table
#[derive(Debug, Clone)]
pub struct TableSummary {
    /// Total row count
    pub rows: u64,
    /// Global data bounds
    pub bounds: DataBounds,
    /// Sorted unique partition values
    pub partitions: Vec<f64>,
    /// Suggested minimap sampling stride for this table size
    pub overview_stride: usize,
}

impl fmt::Display for TableSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Peak Table Summary:")?;
        writeln!(f, "  Rows: {}", self.rows)?;
        writeln!(
            f,
            "  RT range: {:.2} - {:.2} s",
            self.bounds.rt_min, self.bounds.rt_max
        )?;
        writeln!(
            f,
            "  m/z range: {:.4} - {:.4}",
            self.bounds.mz_min, self.bounds.mz_max
        )?;
        if self.partitions.is_empty() {
            writeln!(f, "  Partitions: none")?;
        } else {
            let values: Vec<String> = self.partitions.iter().map(|v| format!("{}", v)).collect();
            writeln!(f, "  Partitions (CV): {}", values.join(", "))?;
        }
        write!(f, "  Overview stride: {}", self.overview_stride)
    }
}

fn compute_bounds(rt: &[f64], mz: &[f64]) -> DataBounds {
    let rt_min = rt.iter().copied().fold(f64::MAX, f64::min);
    let rt_max = rt.iter().copied().fold(f64::MIN, f64::max);
    let mz_min = mz.iter().copied().fold(f64::MAX, f64::min);
    let mz_max = mz.iter().copied().fold(f64::MIN, f64::max);
    DataBounds::new(rt_min, rt_max, mz_min, mz_max)
}

fn collect_partitions(cv: Option<&[f64]>) -> Vec<f64> {
    let Some(col) = cv else {
        return Vec::new();
    };
    let mut values: Vec<f64> = col.iter().copied().filter(|v| !v.is_nan()).collect();
    values.sort_by(f64::total_cmp);
    values.dedup();
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_table() -> PeakTable {
        // 10x10 grid: rt 0..10, mz 100..110, intensity raising with rt
        let mut records = Vec::new();
        for i in 0..10 {
            for j in 0..10 {
                records.push(PeakRecord::new(
                    i as f64,
                    100.0 + j as f64,
                    (i * 10 + j) as f64,
                ));
            }
        }
        PeakTable::from_records(records).unwrap()
    }

    #[test]
    fn test_empty_ingest_fails() {
        let result = PeakTable::from_records(Vec::new());
        assert!(matches!(result, Err(TableError::Empty)));
    }

    #[test]
    fn test_non_finite_rows_rejected() {
        let result = PeakTable::from_records(vec![PeakRecord::new(f64::NAN, 100.0, 1.0)]);
        assert!(matches!(
            result,
            Err(TableError::NonFinite { column: "rt", row: 0 })
        ));

        let result =
            PeakTable::from_records(vec![PeakRecord::new(1.0, 100.0, f64::INFINITY)]);
        assert!(matches!(
            result,
            Err(TableError::NonFinite { column: "intensity", .. })
        ));

        let result = PeakTable::from_records(vec![PeakRecord::new(1.0, 100.0, -5.0)]);
        assert!(matches!(result, Err(TableError::NegativeIntensity { .. })));
    }

    #[test]
    fn test_log_intensity_derivation() {
        let table =
            PeakTable::from_records(vec![PeakRecord::new(1.0, 100.0, 0.0), PeakRecord::new(2.0, 101.0, 999.0)])
                .unwrap();
        assert_eq!(table.log_intensity()[0], 0.0);
        assert!((table.log_intensity()[1] - 1000.0_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_bounds_cached_at_ingest() {
        let table = grid_table();
        let bounds = table.bounds();
        assert_eq!(bounds.rt_min, 0.0);
        assert_eq!(bounds.rt_max, 9.0);
        assert_eq!(bounds.mz_min, 100.0);
        assert_eq!(bounds.mz_max, 109.0);
    }

    #[test]
    fn test_superset_query_returns_everything() {
        let table = grid_table();
        let rows = table
            .range_query(&DataBounds::new(-1.0, 100.0, 0.0, 1000.0), None)
            .unwrap();
        assert_eq!(rows.len() as u64, table.count());
    }

    #[test]
    fn test_disjoint_query_returns_nothing() {
        let table = grid_table();
        let rows = table
            .range_query(&DataBounds::new(50.0, 60.0, 500.0, 600.0), None)
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_boundary_points_included() {
        let table = grid_table();
        // Window edges land exactly on grid coordinates
        let rows = table
            .range_query(&DataBounds::new(2.0, 4.0, 103.0, 105.0), None)
            .unwrap();
        assert_eq!(rows.len(), 9); // rt in {2,3,4} x mz in {103,104,105}
        assert!(rows.rt.iter().any(|&v| v == 2.0));
        assert!(rows.rt.iter().any(|&v| v == 4.0));
        assert!(rows.mz.iter().any(|&v| v == 103.0));
        assert!(rows.mz.iter().any(|&v| v == 105.0));
    }

    #[test]
    fn test_uniform_run_window_count() {
        // 100 points at rt 0.5, 1.5, ..., 99.5; the inclusive [10, 20]
        // window holds the ten at 10.5 through 19.5
        let records: Vec<PeakRecord> = (0..100)
            .map(|i| PeakRecord::new(i as f64 + 0.5, 500.0, 10.0))
            .collect();
        let table = PeakTable::from_records(records).unwrap();

        let rows = table
            .range_query(&DataBounds::new(10.0, 20.0, 0.0, 1000.0), None)
            .unwrap();
        assert_eq!(rows.len(), 10);
        assert_eq!(rows.rt.first(), Some(&10.5));
        assert_eq!(rows.rt.last(), Some(&19.5));
    }

    #[test]
    fn test_source_index_is_ingestion_order() {
        let table = grid_table();
        let rows = table
            .range_query(&DataBounds::new(0.0, 0.0, 100.0, 101.0), None)
            .unwrap();
        assert_eq!(rows.source_index, vec![0, 1]);
    }

    #[test]
    fn test_sampled_stride() {
        let table = grid_table();
        let rows = table.sampled(25).unwrap();
        assert_eq!(rows.len(), 4); // indices 0, 25, 50, 75
        assert_eq!(rows.source_index, vec![0, 25, 50, 75]);

        let all = table.sampled(1).unwrap();
        assert_eq!(all.len() as u64, table.count());

        assert!(matches!(table.sampled(0), Err(QueryError::InvalidStride)));
    }

    #[test]
    fn test_partition_filter() {
        let table = PeakTable::from_records(vec![
            PeakRecord::with_cv(1.0, 100.0, 10.0, -45.0),
            PeakRecord::with_cv(2.0, 101.0, 20.0, -65.0),
            PeakRecord::with_cv(3.0, 102.0, 30.0, -45.0),
            PeakRecord::new(4.0, 103.0, 40.0), // no partition value
        ])
        .unwrap();

        let all = table
            .range_query(&table.bounds(), None)
            .unwrap();
        assert_eq!(all.len(), 4);

        let subset = table
            .range_query(&table.bounds(), Some(-45.0))
            .unwrap();
        assert_eq!(subset.len(), 2);
        assert_eq!(subset.source_index, vec![0, 2]);

        // Unknown partition value matches nothing
        let none = table
            .range_query(&table.bounds(), Some(12.5))
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_partitions_sorted_unique() {
        let table = PeakTable::from_records(vec![
            PeakRecord::with_cv(1.0, 100.0, 10.0, -45.0),
            PeakRecord::with_cv(2.0, 101.0, 20.0, -65.0),
            PeakRecord::with_cv(3.0, 102.0, 30.0, -45.0),
            PeakRecord::with_cv(4.0, 103.0, 40.0, -25.0),
        ])
        .unwrap();

        assert_eq!(table.partitions(), vec![-65.0, -45.0, -25.0]);
    }

    #[test]
    fn test_unpartitioned_table_has_no_partitions() {
        let table = grid_table();
        assert!(!table.has_partition());
        assert!(table.partitions().is_empty());

        // A partition filter over an unpartitioned table matches nothing
        let rows = table.range_query(&table.bounds(), Some(-45.0)).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_summary_display() {
        let table = grid_table();
        let text = table.summary().to_string();
        assert!(text.contains("Rows: 100"));
        assert!(text.contains("RT range: 0.00 - 9.00"));
        assert!(text.contains("Partitions: none"));
    }
}
