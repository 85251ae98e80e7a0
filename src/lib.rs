//! # mzScope - Viewport Queries and Adaptive Peak-Map Rendering
//!
//! `mzscope` is a query and rendering engine for large LC-MS peak lists: it
//! answers rectangular viewport queries over millions of centroided peaks and
//! rasterizes the results into peak-map tiles at interactive rates.
//!
//! ## Key Features
//!
//! - **Columnar Point Table**: Parallel `f64` columns for retention time,
//!   m/z, intensity, and a precomputed `ln(1 + intensity)` render scale,
//!   with an optional compensation-voltage partition column.
//!
//! - **One Query Contract**: The [`query::PeakSource`] trait serves range
//!   queries, strided samples, bounds, and partition values identically from
//!   memory and from disk, so rendering code never knows where rows live.
//!
//! - **Out-of-Core Cache**: Content-addressed Parquet artifacts keyed by
//!   source identity let repeat sessions skip ingestion entirely and keep
//!   the working set off the heap.
//!
//! - **Adaptive Rendering**: Max-aggregation onto a pixel grid with
//!   selectable colormaps, a reduced-detail fast mode for live gestures, and
//!   a sparse-region spread pass so isolated peaks stay visible.
//!
//! - **Stale-Result Suppression**: A background render worker tags every
//!   tile with a generation id; superseded results are discarded instead of
//!   flickering onto the screen out of order.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mzscope::ingest::load_tsv;
//! use mzscope::query::PeakSource;
//! use mzscope::render::{render_tile, Colormap, RenderConfig, RenderRequest};
//! use mzscope::view::{ViewOptions, Viewport};
//!
//! // Load a headered TSV peak list
//! let table = load_tsv("peaks.tsv")?;
//!
//! // Show the full data extent at the default plot size
//! let config = RenderConfig::default();
//! let viewport = Viewport::new(
//!     table.bounds(),
//!     config.plot_width,
//!     config.plot_height,
//!     ViewOptions::default(),
//! )?;
//!
//! // Rasterize one tile and save it
//! let tile = render_tile(
//!     &table,
//!     &RenderRequest {
//!         window: viewport.window(),
//!         colormap: Colormap::Jet,
//!         partition: None,
//!         generation: 1,
//!     },
//!     &config,
//! )?;
//! tile.save_png(std::path::Path::new("peaks.png"))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Out-of-Core Querying
//!
//! ```rust,no_run
//! use mzscope::cache::{CacheCompression, DiskCache, TableHandle};
//! use mzscope::ingest::load_tsv;
//! use mzscope::query::PeakSource;
//!
//! let table = load_tsv("peaks.tsv")?;
//!
//! // Queries route through a content-addressed Parquet artifact; a rerun on
//! // an unchanged file reuses it without re-ingesting.
//! let cache = DiskCache::new(None, CacheCompression::default())?;
//! let handle = TableHandle::open_with_cache(table, &cache, "peaks.tsv");
//! let source = handle.source();
//! println!("{} peaks served from {}", source.count(),
//!     if handle.is_cached() { "disk" } else { "memory" });
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! The library is organized into the following modules:
//!
//! - [`table`]: columnar peak storage with derived columns and global stats
//! - [`query`]: the `PeakSource` contract shared by memory and disk sources
//! - [`ingest`]: TSV peak-list loader
//! - [`cache`]: content-addressed Parquet artifacts for out-of-core queries
//! - [`downsample`]: display-bound spectrum reduction
//! - [`view`]: viewport state (wheel/rect zoom, pan, capped zoom history)
//! - [`render`]: max-aggregation rasterizer with colormaps and fast mode
//! - [`hittest`]: nearest-peak lookup in screen space
//! - [`scheduler`]: throttled background render worker with generation ids
//! - [`schema`]: Arrow schema and footer keys for the cache artifact
//!
//! ## Cache Artifact Format
//!
//! ### Schema
//!
//! | Column | Type | Required | Description |
//! |--------|------|----------|-------------|
//! | rt | Float64 | Yes | Retention time in seconds |
//! | mz | Float64 | Yes | Mass-to-charge ratio |
//! | intensity | Float64 | Yes | Raw signal intensity |
//! | log_intensity | Float64 | Yes | ln(1 + intensity), the render scale |
//! | cv | Float64 | No | Compensation-voltage partition |
//!
//! ### File Footer Metadata
//!
//! The Parquet footer carries JSON-serialized provenance:
//!
//! - `mzscope:format_version`: Artifact format version string
//! - `mzscope:provenance`: Source identity (path, mtime, size), row count,
//!   bounds, and partition values used to validate reuse
//!
//! Artifacts are standard Parquet and can be read with any compatible tool:
//!
//! ```python
//! # Python
//! import pyarrow.parquet as pq
//! df = pq.read_table("peaks_0123456789abcdef.parquet").to_pandas()
//! ```
//!
//! ```sql
//! -- DuckDB
//! SELECT * FROM read_parquet('peaks_0123456789abcdef.parquet')
//! WHERE rt BETWEEN 300 AND 600 AND mz BETWEEN 400 AND 900;
//! ```

// Documentation lints - enforce complete documentation for publication
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
// Allow some patterns common in scientific code
#![allow(clippy::too_many_arguments)]

pub mod cache;
pub mod downsample;
pub mod hittest;
pub mod ingest;
pub mod query;
pub mod render;
pub mod scheduler;
pub mod schema;
pub mod table;
pub mod view;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::cache::{CacheCompression, CachedTable, DiskCache, TableHandle};
    pub use crate::downsample::{downsample, DownsampleConfig, DownsampleError};
    pub use crate::hittest::{nearest_peak, PeakHit, DEFAULT_SNAP_RADIUS_PX};
    pub use crate::ingest::{load_tsv, load_tsv_reader, IngestError};
    pub use crate::query::{
        overview_stride, DataBounds, PeakSource, QueryError, RowSet, OVERVIEW_TARGET_ROWS,
    };
    pub use crate::render::{
        render_minimap, render_tile, Colormap, RenderConfig, RenderRequest, RenderTile,
    };
    pub use crate::scheduler::{RenderScheduler, SchedulerError, DEFAULT_THROTTLE};
    pub use crate::schema::{columns, peak_schema, FORMAT_VERSION};
    pub use crate::table::{PeakRecord, PeakTable, TableError, TableSummary};
    pub use crate::view::{
        ResolutionMode, ViewOptions, ViewTransform, ViewWindow, Viewport, ZoomDirection,
    };
}
