//! # TSV Ingestion
//!
//! Loader-facing entry point for the peak table: a headered, tab-separated
//! file with required columns `rt`, `mz`, `intensity` and an optional `cv`
//! partition column. Columns are matched by header name, not position, and
//! header matching is case-insensitive; unknown columns are ignored.
//!
//! A blank `cv` field means the row belongs to no partition. Everything
//! stricter (non-finite coordinates, negative intensities, zero rows) is
//! enforced by [`PeakTable::from_records`] after parsing.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::table::{PeakRecord, PeakTable, TableError};

/// Errors from TSV parsing and table construction
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// File could not be opened or read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed TSV structure
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A required column is absent from the header row
    #[error("Missing required column '{0}' in header")]
    MissingColumn(&'static str),

    /// A field could not be parsed as a number
    #[error("Row {row}: cannot parse {column} value '{value}'")]
    BadValue {
        /// Zero-based data row index
        row: usize,
        /// Column the value came from
        column: &'static str,
        /// The offending raw field
        value: String,
    },

    /// Parsed rows were rejected by the table
    #[error("Table error: {0}")]
    Table(#[from] TableError),
}

/// Load a peak table from a TSV file
pub fn load_tsv<P: AsRef<Path>>(path: P) -> Result<PeakTable, IngestError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let table = load_tsv_reader(BufReader::new(file))?;
    log::info!("Loaded {} peaks from {}", table.len(), path.display());
    Ok(table)
}

/// Load a peak table from any buffered reader of TSV data
pub fn load_tsv_reader<R: BufRead>(reader: R) -> Result<PeakTable, IngestError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(|s| s.to_lowercase().trim().to_string())
        .collect();

    let required = |name: &'static str| -> Result<usize, IngestError> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or(IngestError::MissingColumn(name))
    };
    let rt_col = required("rt")?;
    let mz_col = required("mz")?;
    let intensity_col = required("intensity")?;
    let cv_col = headers.iter().position(|h| h == "cv");

    let mut records = Vec::new();
    for (row, record) in csv_reader.records().enumerate() {
        let record = record?;
        let rt = parse_field(&record, rt_col, "rt", row)?;
        let mz = parse_field(&record, mz_col, "mz", row)?;
        let intensity = parse_field(&record, intensity_col, "intensity", row)?;
        let cv = match cv_col {
            Some(idx) => parse_optional_field(&record, idx, "cv", row)?,
            None => None,
        };
        records.push(PeakRecord {
            rt,
            mz,
            intensity,
            cv,
        });
    }

    Ok(PeakTable::from_records(records)?)
}

fn parse_field(
    record: &csv::StringRecord,
    idx: usize,
    column: &'static str,
    row: usize,
) -> Result<f64, IngestError> {
    let raw = record.get(idx).unwrap_or("").trim();
    raw.parse::<f64>().map_err(|_| IngestError::BadValue {
        row,
        column,
        value: raw.to_string(),
    })
}

fn parse_optional_field(
    record: &csv::StringRecord,
    idx: usize,
    column: &'static str,
    row: usize,
) -> Result<Option<f64>, IngestError> {
    let raw = record.get(idx).unwrap_or("").trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<f64>()
        .map(Some)
        .map_err(|_| IngestError::BadValue {
            row,
            column,
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::PeakSource;
    use std::io::Cursor;

    fn load(data: &str) -> Result<PeakTable, IngestError> {
        load_tsv_reader(Cursor::new(data.as_bytes()))
    }

    #[test]
    fn test_load_basic_tsv() {
        let table = load("rt\tmz\tintensity\n10.5\t500.25\t1000\n20.0\t600.5\t0\n").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rt(), &[10.5, 20.0]);
        assert_eq!(table.mz(), &[500.25, 600.5]);
        assert_eq!(table.log_intensity()[1], 0.0);
        assert!(!table.has_partition());

        let bounds = table.bounds();
        assert_eq!(bounds.rt_min, 10.5);
        assert_eq!(bounds.mz_max, 600.5);
    }

    #[test]
    fn test_columns_matched_by_header_name() {
        // Reordered columns, mixed case, and an extra column to ignore
        let table = load(
            "Intensity\tnote\tMZ\tRT\n\
             100\tfirst\t500.0\t1.0\n\
             200\tsecond\t501.0\t2.0\n",
        )
        .unwrap();
        assert_eq!(table.rt(), &[1.0, 2.0]);
        assert_eq!(table.mz(), &[500.0, 501.0]);
        assert_eq!(table.intensity(), &[100.0, 200.0]);
    }

    #[test]
    fn test_cv_column_with_blanks() {
        let table = load(
            "rt\tmz\tintensity\tcv\n\
             1.0\t500.0\t10\t-45\n\
             2.0\t501.0\t20\t\n\
             3.0\t502.0\t30\t-65\n",
        )
        .unwrap();
        assert!(table.has_partition());
        let cv = table.cv().unwrap();
        assert_eq!(cv[0], -45.0);
        assert!(cv[1].is_nan());
        assert_eq!(cv[2], -65.0);
        assert_eq!(table.partitions(), vec![-65.0, -45.0]);
    }

    #[test]
    fn test_missing_required_column() {
        let result = load("rt\tintensity\n1.0\t10\n");
        assert!(matches!(result, Err(IngestError::MissingColumn("mz"))));
    }

    #[test]
    fn test_bad_value_reports_row_and_column() {
        let result = load("rt\tmz\tintensity\n1.0\t500.0\t10\n2.0\tabc\t20\n");
        match result {
            Err(IngestError::BadValue { row, column, value }) => {
                assert_eq!(row, 1);
                assert_eq!(column, "mz");
                assert_eq!(value, "abc");
            }
            other => panic!("expected BadValue, got {:?}", other.map(|t| t.len())),
        }
    }

    #[test]
    fn test_header_only_file_fails_as_empty() {
        let result = load("rt\tmz\tintensity\n");
        assert!(matches!(
            result,
            Err(IngestError::Table(TableError::Empty))
        ));
    }

    #[test]
    fn test_load_tsv_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("peaks.tsv");
        std::fs::write(&path, "rt\tmz\tintensity\n5.0\t400.0\t50\n").unwrap();

        let table = load_tsv(&path).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.count(), 1);
    }
}
