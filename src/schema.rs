//! # Peak Table Schema
//!
//! Arrow schema for the columnar peak table shared by the in-memory store and
//! the disk cache artifact.
//!
//! ## Schema Columns
//!
//! | Column | Type | Description | CV Term |
//! |--------|------|-------------|---------|
//! | rt | Float64 | Retention time in seconds | MS:1000016 |
//! | mz | Float64 | Mass-to-charge ratio | MS:1000040 |
//! | intensity | Float64 | Signal intensity | MS:1000042 |
//! | log_intensity | Float64 | ln(1 + intensity), precomputed for rendering | derived |
//! | cv | Float64 (nullable) | FAIMS compensation voltage | MS:1001581 |
//!
//! The `cv` column is only present in tables ingested from partitioned runs;
//! `log_intensity` is derived once at ingest so the render hot path never
//! recomputes it.

use arrow::datatypes::{DataType, Field, Schema, SchemaBuilder};
use std::sync::Arc;

/// Cache artifact format version - follows semantic versioning
pub const FORMAT_VERSION: &str = "1.0.0";

/// Metadata key for the format version in the Parquet footer
pub const KEY_FORMAT_VERSION: &str = "mzscope:format_version";

/// Metadata key for the JSON provenance blob in the Parquet footer
pub const KEY_PROVENANCE: &str = "mzscope:provenance";

/// Column names as constants for type safety
pub mod columns {
    /// Retention time in seconds
    pub const RT: &str = "rt";
    /// Mass-to-charge ratio
    pub const MZ: &str = "mz";
    /// Signal intensity
    pub const INTENSITY: &str = "intensity";
    /// ln(1 + intensity), derived at ingest
    pub const LOG_INTENSITY: &str = "log_intensity";
    /// FAIMS compensation voltage (partition key)
    pub const CV: &str = "cv";
}

/// Creates a Field with CV term metadata annotation
fn field_with_cv(name: &str, data_type: DataType, nullable: bool, cv_accession: &str) -> Field {
    let mut metadata = std::collections::HashMap::new();
    metadata.insert("cv_accession".to_string(), cv_accession.to_string());
    Field::new(name, data_type, nullable).with_metadata(metadata)
}

/// Creates the peak table Arrow schema.
///
/// Every peak is a separate row; the four value columns are required and the
/// partition column is appended only when `with_cv` is set, so artifacts for
/// unpartitioned runs carry no dead column.
///
/// # Example
///
/// ```
/// use mzscope::schema::peak_schema;
///
/// let schema = peak_schema(false);
/// assert_eq!(schema.fields().len(), 4);
/// let schema = peak_schema(true);
/// assert_eq!(schema.fields().len(), 5);
/// ```
pub fn peak_schema(with_cv: bool) -> Schema {
    let mut builder = SchemaBuilder::new();

    builder.push(field_with_cv(
        columns::RT,
        DataType::Float64,
        false,
        "MS:1000016", // scan start time
    ));

    builder.push(field_with_cv(
        columns::MZ,
        DataType::Float64,
        false,
        "MS:1000040", // m/z
    ));

    builder.push(field_with_cv(
        columns::INTENSITY,
        DataType::Float64,
        false,
        "MS:1000042", // peak intensity
    ));

    // Derived column, no CV accession
    builder.push(Field::new(
        columns::LOG_INTENSITY,
        DataType::Float64,
        false,
    ));

    if with_cv {
        builder.push(field_with_cv(
            columns::CV,
            DataType::Float64,
            true,
            "MS:1001581", // FAIMS compensation voltage
        ));
    }

    let mut schema = builder.finish();

    let mut metadata = std::collections::HashMap::new();
    metadata.insert(KEY_FORMAT_VERSION.to_string(), FORMAT_VERSION.to_string());
    schema = schema.with_metadata(metadata);
    schema
}

/// Returns an Arc-wrapped schema for shared ownership
pub fn peak_schema_arc(with_cv: bool) -> Arc<Schema> {
    Arc::new(peak_schema(with_cv))
}

/// Validates that a schema is compatible with the peak table contract.
///
/// Used when reusing an existing cache artifact: a mismatched schema means the
/// file is stale or foreign and must be rebuilt from source.
pub fn validate_schema(schema: &Schema) -> Result<(), SchemaValidationError> {
    let required_columns = [
        (columns::RT, DataType::Float64),
        (columns::MZ, DataType::Float64),
        (columns::INTENSITY, DataType::Float64),
        (columns::LOG_INTENSITY, DataType::Float64),
    ];

    for (name, expected_type) in required_columns {
        match schema.field_with_name(name) {
            Ok(field) => {
                if field.data_type() != &expected_type {
                    return Err(SchemaValidationError::TypeMismatch {
                        column: name.to_string(),
                        expected: format!("{:?}", expected_type),
                        found: format!("{:?}", field.data_type()),
                    });
                }
            }
            Err(_) => {
                return Err(SchemaValidationError::MissingColumn(name.to_string()));
            }
        }
    }

    // cv is optional but must be Float64 when present
    if let Ok(field) = schema.field_with_name(columns::CV) {
        if field.data_type() != &DataType::Float64 {
            return Err(SchemaValidationError::TypeMismatch {
                column: columns::CV.to_string(),
                expected: format!("{:?}", DataType::Float64),
                found: format!("{:?}", field.data_type()),
            });
        }
    }

    Ok(())
}

/// Errors that can occur during schema validation
#[derive(Debug, thiserror::Error)]
pub enum SchemaValidationError {
    /// A required column is absent from the schema
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// A column exists but carries the wrong physical type
    #[error("Type mismatch for column '{column}': expected {expected}, found {found}")]
    TypeMismatch {
        /// Offending column name
        column: String,
        /// Expected Arrow type
        expected: String,
        /// Type actually found
        found: String,
    },
}
