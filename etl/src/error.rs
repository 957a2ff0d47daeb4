//! Error types for the shipload ETL pipeline.
//!
//! One enum per layer:
//!
//! - [`LoadError`] - Reading a named tabular source
//! - [`TransformError`] - Mapping and reconciling raw record sets
//! - [`StorageError`] - Appending to the destination table
//! - [`PipelineError`] - Top-level run orchestration
//!
//! Lower layers convert into [`PipelineError`] through `From`, so `?`
//! works across the whole run.

use thiserror::Error;

use crate::parser::CsvError;

// =============================================================================
// Load Errors
// =============================================================================

/// Errors raised while loading a tabular source.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The source identifier does not resolve to anything readable.
    #[error("Source not found: {0}")]
    SourceNotFound(String),

    /// The source exists but could not be read.
    #[error("Failed to read source '{name}': {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// The source content is not well-formed tabular data.
    #[error("Malformed source '{name}': {source}")]
    Parse {
        name: String,
        #[source]
        source: CsvError,
    },
}

// =============================================================================
// Transform Errors
// =============================================================================

/// Errors raised by the Direct Mapper and the Join-Aggregate Reconciler.
#[derive(Debug, Error, PartialEq)]
pub enum TransformError {
    /// One or more required columns are absent from a raw record set.
    #[error("Dataset '{dataset}' is missing required column(s): {}", .missing.join(", "))]
    SchemaMismatch {
        dataset: String,
        missing: Vec<String>,
    },

    /// The join key column is absent from one side of the join.
    #[error("Dataset '{dataset}' has no join key column '{key}'")]
    MissingJoinKey { dataset: String, key: String },

    /// A cell could not be decoded into the field's type.
    #[error("Dataset '{dataset}', line {line}, column '{column}' (value '{value}'): expected {expected}")]
    InvalidValue {
        dataset: String,
        line: usize,
        column: String,
        value: String,
        expected: &'static str,
    },
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors from the destination store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The database could not be opened or closed.
    #[error("Storage unavailable at '{path}': {source}")]
    Unavailable {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Creating, writing or reading the table failed.
    #[error("Failed to access table '{table}': {source}")]
    WriteFailed {
        table: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Table names are interpolated into SQL and must be plain identifiers.
    #[error("Invalid table name: '{0}'")]
    InvalidTableName(String),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level run errors.
///
/// This is the error type returned by [`crate::transform::pipeline::run`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Loading a source failed.
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// A transform rejected its input.
    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    /// The destination could not be written.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The reconciler stage failed after the direct rows were committed.
    ///
    /// Appends are not wrapped in a run-wide transaction, so the first
    /// component's rows stay in the table.
    #[error("{persisted} direct record(s) were already committed: {source}")]
    PartiallyPersisted {
        persisted: usize,
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    /// The error that actually stopped the run, unwrapping partial persistence.
    pub fn root(&self) -> &PipelineError {
        match self {
            PipelineError::PartiallyPersisted { source, .. } => source.root(),
            other => other,
        }
    }

    /// Number of rows left in the destination by the failed run.
    pub fn persisted(&self) -> usize {
        match self {
            PipelineError::PartiallyPersisted { persisted, .. } => *persisted,
            _ => 0,
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for load operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for transform operations.
pub type TransformResult<T> = Result<T, TransformError>;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type for a whole run.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // LoadError -> PipelineError
        let load_err = LoadError::SourceNotFound("shipping_data_0.csv".into());
        let pipeline_err: PipelineError = load_err.into();
        assert!(pipeline_err.to_string().contains("shipping_data_0.csv"));

        // TransformError -> PipelineError
        let transform_err = TransformError::MissingJoinKey {
            dataset: "routes".into(),
            key: "shipment_identifier".into(),
        };
        let pipeline_err: PipelineError = transform_err.into();
        assert!(pipeline_err.to_string().contains("shipment_identifier"));
    }

    #[test]
    fn test_schema_mismatch_lists_columns() {
        let err = TransformError::SchemaMismatch {
            dataset: "self-contained".into(),
            missing: vec!["product".into(), "on_time".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("self-contained"));
        assert!(msg.contains("product, on_time"));
    }

    #[test]
    fn test_invalid_value_format() {
        let err = TransformError::InvalidValue {
            dataset: "statuses".into(),
            line: 4,
            column: "on_time".into(),
            value: "maybe".into(),
            expected: "a boolean",
        };
        let msg = err.to_string();
        assert!(msg.contains("line 4"));
        assert!(msg.contains("'on_time'"));
        assert!(msg.contains("'maybe'"));
    }

    #[test]
    fn test_partially_persisted_root() {
        let inner = PipelineError::Transform(TransformError::MissingJoinKey {
            dataset: "statuses".into(),
            key: "shipment_identifier".into(),
        });
        let err = PipelineError::PartiallyPersisted {
            persisted: 3,
            source: Box::new(inner),
        };

        assert_eq!(err.persisted(), 3);
        assert!(matches!(
            err.root(),
            PipelineError::Transform(TransformError::MissingJoinKey { .. })
        ));
        assert!(err.to_string().starts_with("3 direct record(s)"));
    }
}
