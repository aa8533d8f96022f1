use std::path::PathBuf;

use thiserror::Error;

use crate::check::CheckErrorGroup;
use crate::validation::DataErrorGroup;

/// Convenience result type for package operations.
pub type PackageResult<T> = Result<T, PackageError>;

/// Error type returned by package operations.
///
/// This is a single error enum shared across properties I/O, data validation, CSV/Parquet
/// access and the batch store.
#[derive(Debug, Error)]
pub enum PackageError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reading error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Parquet reading/writing error.
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Properties document could not be (de)serialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A batch folder could not be turned into a listing pattern.
    #[error("invalid listing pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// The thread pool for parallel batch reads could not be built.
    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// The properties failed one or more conformance checks.
    #[error(transparent)]
    Properties(#[from] CheckErrorGroup),

    /// One or more fields contain cells that do not conform to their declared type.
    #[error(transparent)]
    Data(#[from] DataErrorGroup),

    /// The table's columns are not exactly the resource's fields.
    #[error("columns do not match the resource fields: extra={extra:?} missing={missing:?}")]
    ColumnMismatch {
        extra: Vec<String>,
        missing: Vec<String>,
    },

    /// The input does not have the shape an operation needs.
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// A batch file path is unusable (wrong extension, malformed name, missing folder).
    #[error("invalid batch file '{}': {message}", .path.display())]
    BatchFile { path: PathBuf, message: String },
}
