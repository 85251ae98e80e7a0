//! # Disk Cache Adapter
//!
//! Out-of-core backing for the query engine: a [`DiskCache`] materializes a
//! [`PeakTable`] to a compressed Parquet artifact and hands back a
//! [`CachedTable`] that answers the same [`PeakSource`] contract by streaming
//! record batches instead of scanning memory.
//!
//! Artifacts are content-addressed: the file name is derived from the source
//! file's path, modification time, and size, so re-registering an unchanged
//! source reuses the artifact across sessions while any change to the source
//! produces a fresh key. Each artifact carries a provenance JSON blob in the
//! Parquet footer (bounds, row count, partition values, source identity), so
//! reopening never rescans the data.
//!
//! Cache failures are never fatal to ingestion:
//! [`TableHandle::open_with_cache`] logs a warning and keeps the table in
//! memory when registration fails, and a corrupt artifact found on reuse is
//! deleted and rebuilt from the source table.
//!
//! ## Example
//!
//! ```rust,no_run
//! use mzscope::cache::{CacheCompression, DiskCache, TableHandle};
//! use mzscope::ingest::load_tsv;
//!
//! # fn main() -> anyhow::Result<()> {
//! let table = load_tsv("run.tsv")?;
//! let cache = DiskCache::new(None, CacheCompression::Snappy)?;
//! let handle = TableHandle::open_with_cache(table, &cache, "run.tsv");
//! println!("cache holds {} bytes", cache.cache_size()?);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::fs::{self, File};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use arrow::array::{Array, ArrayRef, Float64Array, Float64Builder};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use gxhash::gxhash64;
use parquet::arrow::arrow_reader::{ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder};
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, Encoding, ZstdLevel};
use parquet::file::properties::{EnabledStatistics, WriterProperties};
use parquet::format::KeyValue;
use parquet::schema::types::ColumnPath;
use serde::{Deserialize, Serialize};

use crate::query::{DataBounds, PeakSource, QueryError, RowSet};
use crate::schema::{
    columns, peak_schema_arc, validate_schema, SchemaValidationError, FORMAT_VERSION,
    KEY_FORMAT_VERSION, KEY_PROVENANCE,
};
use crate::table::PeakTable;

/// Default number of rows per record batch when streaming an artifact
pub const DEFAULT_BATCH_SIZE: usize = 65_536;

/// Rows per batch when writing; matches the row group size so each group
/// holds whole batches
const WRITE_CHUNK_ROWS: usize = 100_000;

/// Default ZSTD level when compression is selected by name
const DEFAULT_ZSTD_LEVEL: i32 = 3;

/// Errors from cache registration and artifact management
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error while building record batches
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet read or write error
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Provenance blob could not be serialized or parsed
    #[error("Provenance error: {0}")]
    Provenance(#[from] serde_json::Error),

    /// Artifact schema does not match the peak table contract
    #[error("Schema validation failed: {0}")]
    Schema(#[from] SchemaValidationError),

    /// Artifact exists but cannot be trusted; the caller deletes and rebuilds
    #[error("Invalid cache artifact: {0}")]
    InvalidArtifact(String),
}

/// Compression codec for cache artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheCompression {
    /// Snappy: fast writes, moderate size (default)
    Snappy,
    /// ZSTD at the given level: slower writes, smallest files
    Zstd(i32),
    /// No compression
    Uncompressed,
}

impl Default for CacheCompression {
    fn default() -> Self {
        Self::Snappy
    }
}

impl CacheCompression {
    fn to_parquet(self) -> Compression {
        match self {
            Self::Snappy => Compression::SNAPPY,
            Self::Zstd(level) => {
                Compression::ZSTD(ZstdLevel::try_new(level).unwrap_or(ZstdLevel::default()))
            }
            Self::Uncompressed => Compression::UNCOMPRESSED,
        }
    }
}

impl fmt::Display for CacheCompression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Snappy => write!(f, "snappy"),
            Self::Zstd(level) => write!(f, "zstd({})", level),
            Self::Uncompressed => write!(f, "none"),
        }
    }
}

impl FromStr for CacheCompression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "snappy" => Ok(Self::Snappy),
            "zstd" => Ok(Self::Zstd(DEFAULT_ZSTD_LEVEL)),
            "none" | "uncompressed" => Ok(Self::Uncompressed),
            other => Err(format!(
                "Unknown compression '{}' (expected one of: snappy, zstd, none)",
                other
            )),
        }
    }
}

/// Identity of a source file at registration time.
///
/// The artifact name hashes all three fields, so touching or rewriting the
/// source file retires its old artifact and forces a rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceKey {
    path: String,
    mtime_ms: i64,
    size: u64,
}

impl SourceKey {
    /// Read the source file's identity from the filesystem
    pub fn for_path(path: &Path) -> Result<Self, CacheError> {
        let metadata = fs::metadata(path)?;
        let mtime = metadata.modified()?;
        Ok(Self {
            path: path.to_string_lossy().into_owned(),
            mtime_ms: DateTime::<Utc>::from(mtime).timestamp_millis(),
            size: metadata.len(),
        })
    }

    /// Content-addressed artifact file name for this identity
    pub fn artifact_name(&self) -> String {
        format!("peaks_{:016x}.parquet", self.hash())
    }

    fn hash(&self) -> u64 {
        let mut bytes = Vec::with_capacity(self.path.len() + 16);
        bytes.extend_from_slice(self.path.as_bytes());
        bytes.extend_from_slice(&self.mtime_ms.to_le_bytes());
        bytes.extend_from_slice(&self.size.to_le_bytes());
        gxhash64(&bytes, 0)
    }
}

/// Provenance blob stored as JSON in the artifact footer.
///
/// Carries everything needed to reopen an artifact without scanning it, plus
/// the source identity used to detect stale or foreign files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheProvenance {
    /// Artifact format version at write time
    pub format_version: String,
    /// Source file path as registered
    pub source_path: String,
    /// Source modification time, milliseconds since the Unix epoch
    pub source_mtime_ms: i64,
    /// Source size in bytes
    pub source_size: u64,
    /// Row count
    pub rows: u64,
    /// Global retention time minimum
    pub rt_min: f64,
    /// Global retention time maximum
    pub rt_max: f64,
    /// Global m/z minimum
    pub mz_min: f64,
    /// Global m/z maximum
    pub mz_max: f64,
    /// Sorted unique partition values
    pub partitions: Vec<f64>,
    /// Artifact creation timestamp
    pub created_at: DateTime<Utc>,
}

impl CacheProvenance {
    fn for_table(table: &PeakTable, key: &SourceKey) -> Self {
        let bounds = table.bounds();
        Self {
            format_version: FORMAT_VERSION.to_string(),
            source_path: key.path.clone(),
            source_mtime_ms: key.mtime_ms,
            source_size: key.size,
            rows: table.count(),
            rt_min: bounds.rt_min,
            rt_max: bounds.rt_max,
            mz_min: bounds.mz_min,
            mz_max: bounds.mz_max,
            partitions: table.partitions(),
            created_at: Utc::now(),
        }
    }

    fn bounds(&self) -> DataBounds {
        DataBounds::new(self.rt_min, self.rt_max, self.mz_min, self.mz_max)
    }

    fn matches(&self, key: &SourceKey) -> bool {
        self.source_path == key.path
            && self.source_mtime_ms == key.mtime_ms
            && self.source_size == key.size
    }
}

/// Content-addressed Parquet cache; one instance owns one directory.
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
    compression: CacheCompression,
    batch_size: usize,
}

impl DiskCache {
    /// Open a cache rooted at `dir`, creating the directory if needed.
    ///
    /// `None` uses `mzscope-cache` under the system temp directory.
    pub fn new(dir: Option<PathBuf>, compression: CacheCompression) -> Result<Self, CacheError> {
        let dir = dir.unwrap_or_else(|| std::env::temp_dir().join("mzscope-cache"));
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            compression,
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    /// Override the streaming batch size for tables opened by this cache
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Directory owned by this cache
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Materialize `table` for `source_path`, or reuse the existing artifact
    /// when the source is unchanged.
    ///
    /// A corrupt, foreign, or stale artifact under the expected name is
    /// deleted and rebuilt from `table` rather than surfaced as an error.
    pub fn register(
        &self,
        table: &PeakTable,
        source_path: impl AsRef<Path>,
    ) -> Result<CachedTable, CacheError> {
        let key = SourceKey::for_path(source_path.as_ref())?;
        let artifact = self.dir.join(key.artifact_name());

        if artifact.exists() {
            match CachedTable::open_for_key(&artifact, &key, self.batch_size) {
                Ok(cached) => {
                    log::debug!("Reusing cache artifact {}", artifact.display());
                    return Ok(cached);
                }
                Err(e) => {
                    log::warn!(
                        "Cache artifact {} unusable ({}), rebuilding",
                        artifact.display(),
                        e
                    );
                    fs::remove_file(&artifact)?;
                }
            }
        }

        self.write_artifact(table, &key, &artifact)?;
        let cached = CachedTable::open_for_key(&artifact, &key, self.batch_size)?;
        log::info!(
            "Materialized {} rows to {} ({})",
            table.len(),
            artifact.display(),
            self.compression
        );
        Ok(cached)
    }

    /// Materialize in the background without blocking ingestion.
    ///
    /// Used when out-of-core mode is off: the in-memory table serves queries
    /// immediately while the artifact is written for a later session. Write
    /// failures are logged, never propagated.
    pub fn warm(
        &self,
        table: Arc<PeakTable>,
        source_path: impl Into<PathBuf>,
    ) -> Result<JoinHandle<()>, CacheError> {
        let cache = self.clone();
        let source = source_path.into();
        let handle = thread::Builder::new()
            .name("mzscope-cache-warm".to_string())
            .spawn(move || match cache.register(table.as_ref(), &source) {
                Ok(_) => log::debug!("Cache warm complete for {}", source.display()),
                Err(e) => log::warn!("Cache warm failed for {}: {}", source.display(), e),
            })?;
        Ok(handle)
    }

    /// Total bytes of cache artifacts in the directory
    pub fn cache_size(&self) -> Result<u64, CacheError> {
        let mut total = 0;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if is_artifact_name(&entry.file_name().to_string_lossy()) {
                total += entry.metadata()?.len();
            }
        }
        Ok(total)
    }

    /// Remove every artifact in the directory, returning how many were
    /// deleted. Tables opened from removed artifacts fail on their next
    /// query.
    pub fn clear(&self) -> Result<usize, CacheError> {
        let mut removed = 0;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if is_artifact_name(&entry.file_name().to_string_lossy()) {
                fs::remove_file(entry.path())?;
                removed += 1;
            }
        }
        log::info!(
            "Cleared {} cache artifacts from {}",
            removed,
            self.dir.display()
        );
        Ok(removed)
    }

    fn write_artifact(
        &self,
        table: &PeakTable,
        key: &SourceKey,
        path: &Path,
    ) -> Result<(), CacheError> {
        if let Err(e) = self.write_rows(table, key, path) {
            // Never leave a torn artifact behind for a later open to trust
            let _ = fs::remove_file(path);
            return Err(e);
        }
        Ok(())
    }

    fn write_rows(&self, table: &PeakTable, key: &SourceKey, path: &Path) -> Result<(), CacheError> {
        let schema = peak_schema_arc(table.has_partition());
        let provenance = CacheProvenance::for_table(table, key);
        let props = self.writer_properties(serde_json::to_string(&provenance)?);

        let file = File::create(path)?;
        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;

        let rows = table.len();
        let mut start = 0;
        while start < rows {
            let end = (start + WRITE_CHUNK_ROWS).min(rows);
            let batch = record_batch(table, schema.clone(), start..end)?;
            writer.write(&batch)?;
            start = end;
        }
        writer.close()?;
        Ok(())
    }

    fn writer_properties(&self, provenance_json: String) -> WriterProperties {
        let mut builder = WriterProperties::builder()
            .set_compression(self.compression.to_parquet())
            .set_statistics_enabled(EnabledStatistics::Chunk)
            .set_max_row_group_size(WRITE_CHUNK_ROWS);

        // Continuous float columns: dictionary encoding is useless at this
        // cardinality, BYTE_STREAM_SPLIT groups exponent and mantissa bytes
        // for much better compression
        let float_columns = [
            columns::RT,
            columns::MZ,
            columns::INTENSITY,
            columns::LOG_INTENSITY,
            columns::CV,
        ];
        for col in float_columns {
            let path = ColumnPath::new(vec![col.to_string()]);
            builder = builder
                .set_column_dictionary_enabled(path.clone(), false)
                .set_column_encoding(path, Encoding::BYTE_STREAM_SPLIT);
        }

        builder = builder.set_key_value_metadata(Some(vec![
            KeyValue {
                key: KEY_FORMAT_VERSION.to_string(),
                value: Some(FORMAT_VERSION.to_string()),
            },
            KeyValue {
                key: KEY_PROVENANCE.to_string(),
                value: Some(provenance_json),
            },
        ]));

        builder.build()
    }
}

fn is_artifact_name(name: &str) -> bool {
    name.starts_with("peaks_") && name.ends_with(".parquet")
}

fn build_f64_array(data: &[f64]) -> ArrayRef {
    let mut builder = Float64Builder::with_capacity(data.len());
    builder.append_slice(data);
    Arc::new(builder.finish())
}

fn record_batch(
    table: &PeakTable,
    schema: Arc<arrow::datatypes::Schema>,
    range: Range<usize>,
) -> Result<RecordBatch, CacheError> {
    let mut arrays: Vec<ArrayRef> = vec![
        build_f64_array(&table.rt()[range.clone()]),
        build_f64_array(&table.mz()[range.clone()]),
        build_f64_array(&table.intensity()[range.clone()]),
        build_f64_array(&table.log_intensity()[range.clone()]),
    ];
    if let Some(cv) = table.cv() {
        // Rows without a partition value carry NaN, round-tripped as a value
        arrays.push(build_f64_array(&cv[range]));
    }
    Ok(RecordBatch::try_new(schema, arrays)?)
}

fn read_provenance(kv: Option<&Vec<KeyValue>>) -> Result<Option<CacheProvenance>, CacheError> {
    let Some(list) = kv else {
        return Ok(None);
    };
    for entry in list {
        if entry.key == KEY_PROVENANCE {
            let Some(json) = &entry.value else {
                return Ok(None);
            };
            return Ok(Some(serde_json::from_str(json)?));
        }
    }
    Ok(None)
}

/// Disk-backed peak store streaming one cache artifact.
///
/// Bounds, count, and partitions come from the footer provenance, so opening
/// is metadata-only; each query opens a fresh streaming reader over the file.
#[derive(Debug, Clone)]
pub struct CachedTable {
    path: PathBuf,
    batch_size: usize,
    bounds: DataBounds,
    count: u64,
    partitions: Vec<f64>,
    has_cv: bool,
}

impl CachedTable {
    /// Open an artifact with the default batch size
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        Self::open_with_batch_size(path, DEFAULT_BATCH_SIZE)
    }

    /// Open an artifact, streaming `batch_size` rows per record batch.
    ///
    /// An artifact without a provenance footer is accepted if its schema
    /// validates; bounds, count, and partitions are then recomputed by a full
    /// scan.
    pub fn open_with_batch_size(
        path: impl AsRef<Path>,
        batch_size: usize,
    ) -> Result<Self, CacheError> {
        Self::open_inner(path.as_ref(), batch_size.max(1), None)
    }

    fn open_for_key(path: &Path, key: &SourceKey, batch_size: usize) -> Result<Self, CacheError> {
        Self::open_inner(path, batch_size, Some(key))
    }

    fn open_inner(
        path: &Path,
        batch_size: usize,
        required_key: Option<&SourceKey>,
    ) -> Result<Self, CacheError> {
        let file = File::open(path)?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
        validate_schema(builder.schema())?;

        let has_cv = builder.schema().field_with_name(columns::CV).is_ok();
        let file_meta = builder.metadata().file_metadata();
        let footer_rows = file_meta.num_rows();
        if footer_rows <= 0 {
            return Err(CacheError::InvalidArtifact("artifact has no rows".into()));
        }
        let provenance = read_provenance(file_meta.key_value_metadata())?;
        drop(builder);

        match provenance {
            Some(p) => {
                if p.format_version != FORMAT_VERSION {
                    return Err(CacheError::InvalidArtifact(format!(
                        "format version {} (expected {})",
                        p.format_version, FORMAT_VERSION
                    )));
                }
                if p.rows != footer_rows as u64 {
                    return Err(CacheError::InvalidArtifact(format!(
                        "provenance says {} rows, footer says {}",
                        p.rows, footer_rows
                    )));
                }
                if let Some(key) = required_key {
                    if !p.matches(key) {
                        return Err(CacheError::InvalidArtifact(
                            "provenance does not match the registered source".into(),
                        ));
                    }
                }
                Ok(Self {
                    path: path.to_path_buf(),
                    batch_size,
                    bounds: p.bounds(),
                    count: p.rows,
                    partitions: p.partitions,
                    has_cv,
                })
            }
            None => {
                // Our artifacts always carry provenance; reuse must not
                // trust a file we cannot tie to the source
                if required_key.is_some() {
                    return Err(CacheError::InvalidArtifact(
                        "artifact has no provenance footer".into(),
                    ));
                }
                let (bounds, count, partitions) = scan_stats(path, batch_size, has_cv)?;
                Ok(Self {
                    path: path.to_path_buf(),
                    batch_size,
                    bounds,
                    count,
                    partitions,
                    has_cv,
                })
            }
        }
    }

    /// Path of the artifact backing this table
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn reader(&self) -> Result<ParquetRecordBatchReader, QueryError> {
        let file = File::open(&self.path)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?
            .with_batch_size(self.batch_size)
            .build()?;
        Ok(reader)
    }
}

fn column_f64<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Float64Array, QueryError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| QueryError::ColumnNotFound(name.to_string()))?
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| QueryError::InvalidFormat(format!("column '{}' is not Float64", name)))
}

fn cv_value(col: Option<&Float64Array>, i: usize) -> Option<f64> {
    col.map(|c| if c.is_null(i) { f64::NAN } else { c.value(i) })
}

fn scan_stats(
    path: &Path,
    batch_size: usize,
    has_cv: bool,
) -> Result<(DataBounds, u64, Vec<f64>), CacheError> {
    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?
        .with_batch_size(batch_size)
        .build()?;

    let mut rt_min = f64::MAX;
    let mut rt_max = f64::MIN;
    let mut mz_min = f64::MAX;
    let mut mz_max = f64::MIN;
    let mut count = 0u64;
    let mut partitions = Vec::new();

    for batch in reader {
        let batch = batch?;
        let rt = column_f64(&batch, columns::RT)
            .map_err(|e| CacheError::InvalidArtifact(e.to_string()))?;
        let mz = column_f64(&batch, columns::MZ)
            .map_err(|e| CacheError::InvalidArtifact(e.to_string()))?;
        let cv = if has_cv {
            Some(
                column_f64(&batch, columns::CV)
                    .map_err(|e| CacheError::InvalidArtifact(e.to_string()))?,
            )
        } else {
            None
        };

        for i in 0..batch.num_rows() {
            rt_min = rt_min.min(rt.value(i));
            rt_max = rt_max.max(rt.value(i));
            mz_min = mz_min.min(mz.value(i));
            mz_max = mz_max.max(mz.value(i));
            if let Some(v) = cv_value(cv, i) {
                if !v.is_nan() {
                    partitions.push(v);
                }
            }
        }
        count += batch.num_rows() as u64;
    }

    partitions.sort_by(f64::total_cmp);
    partitions.dedup();
    Ok((DataBounds::new(rt_min, rt_max, mz_min, mz_max), count, partitions))
}

impl PeakSource for CachedTable {
    fn range_query(
        &self,
        bounds: &DataBounds,
        partition: Option<f64>,
    ) -> Result<RowSet, QueryError> {
        let mut rows = RowSet::with_capacity(0, self.has_cv);
        let mut base = 0u64;

        for batch in self.reader()? {
            let batch = batch?;
            let rt = column_f64(&batch, columns::RT)?;
            let mz = column_f64(&batch, columns::MZ)?;
            let intensity = column_f64(&batch, columns::INTENSITY)?;
            let log_intensity = column_f64(&batch, columns::LOG_INTENSITY)?;
            let cv = if self.has_cv {
                Some(column_f64(&batch, columns::CV)?)
            } else {
                None
            };

            for i in 0..batch.num_rows() {
                if !bounds.contains(rt.value(i), mz.value(i)) {
                    continue;
                }
                let cv_v = cv_value(cv, i);
                if let Some(p) = partition {
                    // NaN entries (rows without a value) never match
                    match cv_v {
                        Some(v) if v == p => {}
                        _ => continue,
                    }
                }
                rows.push(
                    rt.value(i),
                    mz.value(i),
                    intensity.value(i),
                    log_intensity.value(i),
                    cv_v,
                    base + i as u64,
                );
            }
            base += batch.num_rows() as u64;
        }

        Ok(rows)
    }

    fn bounds(&self) -> DataBounds {
        self.bounds
    }

    fn count(&self) -> u64 {
        self.count
    }

    fn sampled(&self, stride: usize) -> Result<RowSet, QueryError> {
        if stride == 0 {
            return Err(QueryError::InvalidStride);
        }

        let capacity = (self.count as usize) / stride + 1;
        let mut rows = RowSet::with_capacity(capacity, self.has_cv);
        let mut base = 0u64;

        for batch in self.reader()? {
            let batch = batch?;
            let rt = column_f64(&batch, columns::RT)?;
            let mz = column_f64(&batch, columns::MZ)?;
            let intensity = column_f64(&batch, columns::INTENSITY)?;
            let log_intensity = column_f64(&batch, columns::LOG_INTENSITY)?;
            let cv = if self.has_cv {
                Some(column_f64(&batch, columns::CV)?)
            } else {
                None
            };

            for i in 0..batch.num_rows() {
                let index = base + i as u64;
                if index % stride as u64 != 0 {
                    continue;
                }
                rows.push(
                    rt.value(i),
                    mz.value(i),
                    intensity.value(i),
                    log_intensity.value(i),
                    cv_value(cv, i),
                    index,
                );
            }
            base += batch.num_rows() as u64;
        }

        Ok(rows)
    }

    fn partitions(&self) -> Vec<f64> {
        self.partitions.clone()
    }
}

/// A peak store that is either in memory or disk-backed.
///
/// Ingestion always has a working handle: cache registration failure
/// downgrades to the in-memory table instead of failing the session.
#[derive(Clone)]
pub enum TableHandle {
    /// Rows held in memory
    Memory(Arc<PeakTable>),
    /// Rows streamed from a cache artifact
    Cached(Arc<CachedTable>),
}

impl TableHandle {
    /// Wrap a table without touching the disk cache
    pub fn in_memory(table: PeakTable) -> Self {
        Self::Memory(Arc::new(table))
    }

    /// Register `table` with the cache, falling back to memory when
    /// registration fails
    pub fn open_with_cache(
        table: PeakTable,
        cache: &DiskCache,
        source_path: impl AsRef<Path>,
    ) -> Self {
        match cache.register(&table, source_path.as_ref()) {
            Ok(cached) => Self::Cached(Arc::new(cached)),
            Err(e) => {
                log::warn!(
                    "Disk cache unavailable for {} ({}), keeping table in memory",
                    source_path.as_ref().display(),
                    e
                );
                Self::Memory(Arc::new(table))
            }
        }
    }

    /// True when queries stream from disk
    pub fn is_cached(&self) -> bool {
        matches!(self, Self::Cached(_))
    }

    /// Shareable query source for the render scheduler
    pub fn source(&self) -> Arc<dyn PeakSource + Send + Sync> {
        match self {
            Self::Memory(table) => table.clone(),
            Self::Cached(cached) => cached.clone(),
        }
    }
}

impl PeakSource for TableHandle {
    fn range_query(
        &self,
        bounds: &DataBounds,
        partition: Option<f64>,
    ) -> Result<RowSet, QueryError> {
        match self {
            Self::Memory(table) => table.range_query(bounds, partition),
            Self::Cached(cached) => cached.range_query(bounds, partition),
        }
    }

    fn bounds(&self) -> DataBounds {
        match self {
            Self::Memory(table) => table.bounds(),
            Self::Cached(cached) => cached.bounds(),
        }
    }

    fn count(&self) -> u64 {
        match self {
            Self::Memory(table) => table.count(),
            Self::Cached(cached) => cached.count(),
        }
    }

    fn sampled(&self, stride: usize) -> Result<RowSet, QueryError> {
        match self {
            Self::Memory(table) => table.sampled(stride),
            Self::Cached(cached) => cached.sampled(stride),
        }
    }

    fn partitions(&self) -> Vec<f64> {
        match self {
            Self::Memory(table) => table.partitions(),
            Self::Cached(cached) => cached.partitions(),
        }
    }
}
