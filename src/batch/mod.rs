//! Immutable batch files and their reconciliation into one table.
//!
//! Every upload becomes a new Parquet file under `resources/<name>/batch/`, named
//! `{timestamp}-{uuid4}.parquet`. Files are never rewritten. Reading attaches each file's
//! timestamp as the [`TIMESTAMP_COLUMN`]; joining sorts on it and keeps the latest row per
//! primary key.
//!
//! ```no_run
//! use data_package_core::batch::{
//!     StoreOptions, join_resource_batches, read_resource_batches, write_resource_batch,
//! };
//! use data_package_core::properties::{FieldProperties, FieldType, ResourceProperties, TableSchemaProperties};
//! use data_package_core::types::Table;
//!
//! # fn main() -> Result<(), data_package_core::PackageError> {
//! let resource = ResourceProperties::new("birds")
//!     .with_title("Birds")
//!     .with_description("Bird counts")
//!     .with_schema(
//!         TableSchemaProperties::new(vec![
//!             FieldProperties::new("id", FieldType::Integer),
//!             FieldProperties::new("species", FieldType::String),
//!         ])
//!         .with_primary_key("id"),
//!     );
//! let options = StoreOptions::new("my-package");
//!
//! let data = Table::from_rows(&["id", "species"], &[vec![Some("0"), Some("robin")]]);
//! write_resource_batch(&data, &resource, &options)?;
//!
//! let batches = read_resource_batches(&resource, None, &options)?;
//! let current = join_resource_batches(batches, &resource, &options)?;
//! println!("rows={}", current.row_count());
//! # Ok(())
//! # }
//! ```

mod naming;
mod observability;

use std::collections::HashSet;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;

use crate::check::{CheckOptions, ensure_resource_properties};
use crate::error::{PackageError, PackageResult};
use crate::ingestion::parquet::{read_parquet_table, write_parquet_table, write_parquet_table_to_path};
use crate::paths::{resource_batch_dir, resource_data_file};
use crate::properties::ResourceProperties;
use crate::types::{Cell, Table};
use crate::validation::check_data;

pub use naming::{BATCH_NAME_PATTERN, TIMESTAMP_FORMAT, batch_timestamp, new_batch_name, next_batch_time};
pub use observability::{
    CompositeObserver, FileObserver, StdErrObserver, StoreContext, StoreObserver, StoreOperation,
    StoreSeverity, StoreStats, severity_for_error,
};

/// Internal column holding each row's batch timestamp between reading and joining.
pub const TIMESTAMP_COLUMN: &str = "_batch_timestamp";

/// Configuration for batch store calls.
#[derive(Clone)]
pub struct StoreOptions {
    /// Directory containing `datapackage.json` and `resources/`.
    pub package_root: PathBuf,
    /// Options for the resource properties check run by every operation.
    pub check: CheckOptions,
    /// Worker threads for reading batch files. `None` uses rayon's global pool.
    pub num_threads: Option<usize>,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn StoreObserver>>,
    /// Severity at which `on_alert` is invoked.
    pub alert_at_or_above: StoreSeverity,
}

impl StoreOptions {
    pub fn new(package_root: impl Into<PathBuf>) -> Self {
        Self {
            package_root: package_root.into(),
            check: CheckOptions::default(),
            num_threads: None,
            observer: None,
            alert_at_or_above: StoreSeverity::Critical,
        }
    }

    pub fn with_check(mut self, check: CheckOptions) -> Self {
        self.check = check;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn StoreObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    fn observe<T>(
        &self,
        ctx: StoreContext,
        result: PackageResult<T>,
        stats: impl FnOnce(&T) -> StoreStats,
    ) -> PackageResult<T> {
        if let Some(obs) = self.observer.as_ref() {
            match &result {
                Ok(value) => obs.on_success(&ctx, stats(value)),
                Err(e) => {
                    let sev = severity_for_error(e);
                    obs.on_failure(&ctx, sev, e);
                    if sev >= self.alert_at_or_above {
                        obs.on_alert(&ctx, sev, e);
                    }
                }
            }
        }
        result
    }
}

impl fmt::Debug for StoreOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreOptions")
            .field("package_root", &self.package_root)
            .field("check", &self.check)
            .field("num_threads", &self.num_threads)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

fn context(operation: StoreOperation, resource: &ResourceProperties, path: Option<PathBuf>) -> StoreContext {
    StoreContext {
        operation,
        resource: resource.name().unwrap_or_default().to_string(),
        path,
    }
}

/// Check the resource properties and return its name.
fn checked_name<'a>(resource: &'a ResourceProperties, options: &StoreOptions) -> PackageResult<&'a str> {
    ensure_resource_properties(&serde_json::to_value(resource)?, &options.check)?;
    resource.name().ok_or_else(|| PackageError::SchemaMismatch {
        message: "resource has no name".to_string(),
    })
}

fn reserved_column_error(path: &Path) -> PackageError {
    PackageError::BatchFile {
        path: path.to_path_buf(),
        message: format!("column '{TIMESTAMP_COLUMN}' is reserved for batch timestamps"),
    }
}

/// Validate `data` and write it as a new batch file. Returns the path of the new file.
///
/// Nothing is written when the properties or the data fail their checks. The batch file is
/// created exclusively, so an existing file is never overwritten, and its timestamp sorts
/// strictly after every batch already in the folder.
pub fn write_resource_batch(
    data: &Table,
    resource: &ResourceProperties,
    options: &StoreOptions,
) -> PackageResult<PathBuf> {
    let result = write_batch_impl(data, resource, options);
    let rows = data.row_count();
    options.observe(
        context(StoreOperation::WriteBatch, resource, result.as_ref().ok().cloned()),
        result,
        |_| StoreStats { rows, files: 1 },
    )
}

fn write_batch_impl(data: &Table, resource: &ResourceProperties, options: &StoreOptions) -> PackageResult<PathBuf> {
    let name = checked_name(resource, options)?;
    let dir = resource_batch_dir(&options.package_root, name);
    if data.index_of(TIMESTAMP_COLUMN).is_some() {
        return Err(reserved_column_error(&dir));
    }
    let normalized = check_data(data, resource)?;

    fs::create_dir_all(&dir)?;
    let newest = list_batch_dir(&dir)?
        .iter()
        .filter_map(|p| batch_timestamp(p).ok())
        .max();
    let path = dir.join(new_batch_name(next_batch_time(Utc::now(), newest.as_deref())));
    let file = OpenOptions::new().write(true).create_new(true).open(&path)?;
    if let Err(e) = write_parquet_table(file, &normalized) {
        let _ = fs::remove_file(&path);
        return Err(e);
    }

    tracing::debug!(resource = name, path = %path.display(), rows = normalized.row_count(), "wrote batch");
    Ok(path)
}

/// List a resource's batch files, sorted by name (and so by timestamp).
///
/// A missing batch folder lists as empty.
pub fn list_resource_batches(resource: &ResourceProperties, options: &StoreOptions) -> PackageResult<Vec<PathBuf>> {
    let name = checked_name(resource, options)?;
    list_batch_dir(&resource_batch_dir(&options.package_root, name))
}

fn list_batch_dir(dir: &Path) -> PackageResult<Vec<PathBuf>> {
    let pattern = format!(
        "{}/*.{}",
        glob::Pattern::escape(&dir.to_string_lossy()),
        naming::BATCH_EXTENSION
    );
    let mut paths = glob::glob(&pattern)?
        .map(|entry| entry.map_err(|e| PackageError::Io(e.into_error())))
        .collect::<PackageResult<Vec<_>>>()?;
    paths.sort();
    tracing::debug!(dir = %dir.display(), files = paths.len(), "listed batches");
    Ok(paths)
}

/// Read batch files, validate each against `resource`, and attach its timestamp.
///
/// With `paths = None`, every batch file of the resource is read. Each returned table carries
/// an extra [`TIMESTAMP_COLUMN`]; results keep the order of `paths`.
pub fn read_resource_batches(
    resource: &ResourceProperties,
    paths: Option<&[PathBuf]>,
    options: &StoreOptions,
) -> PackageResult<Vec<Table>> {
    let result = read_batches_impl(resource, paths, options);
    options.observe(context(StoreOperation::ReadBatches, resource, None), result, |tables| {
        StoreStats {
            rows: tables.iter().map(Table::row_count).sum(),
            files: tables.len(),
        }
    })
}

fn read_batches_impl(
    resource: &ResourceProperties,
    paths: Option<&[PathBuf]>,
    options: &StoreOptions,
) -> PackageResult<Vec<Table>> {
    let name = checked_name(resource, options)?;
    let paths = match paths {
        Some(paths) => paths.to_vec(),
        None => list_batch_dir(&resource_batch_dir(&options.package_root, name))?,
    };

    let read_all = || {
        paths
            .par_iter()
            .map(|path| read_batch(path, resource))
            .collect::<PackageResult<Vec<_>>>()
    };
    match options.num_threads {
        Some(n) => ThreadPoolBuilder::new().num_threads(n.max(1)).build()?.install(read_all),
        None => read_all(),
    }
}

fn read_batch(path: &Path, resource: &ResourceProperties) -> PackageResult<Table> {
    let timestamp = batch_timestamp(path)?;
    let table = read_parquet_table(path)?;
    if table.index_of(TIMESTAMP_COLUMN).is_some() {
        return Err(reserved_column_error(path));
    }
    let table = check_data(&table, resource)?;
    tracing::trace!(path = %path.display(), rows = table.row_count(), "read batch");
    Ok(table.with_constant_column(TIMESTAMP_COLUMN, &timestamp))
}

/// Reconcile timestamped batch tables into one table.
///
/// Rows are stably sorted by timestamp, then only the last row for each primary key survives
/// (the whole row is the key when none is declared). The timestamp column is dropped and the
/// result validated against `resource`.
pub fn join_resource_batches(
    tables: Vec<Table>,
    resource: &ResourceProperties,
    options: &StoreOptions,
) -> PackageResult<Table> {
    let files = tables.len();
    let result = join_impl(tables, resource, options);
    options.observe(context(StoreOperation::JoinBatches, resource, None), result, |table| {
        StoreStats {
            rows: table.row_count(),
            files,
        }
    })
}

fn join_impl(tables: Vec<Table>, resource: &ResourceProperties, options: &StoreOptions) -> PackageResult<Table> {
    checked_name(resource, options)?;
    if tables.is_empty() {
        let columns = resource
            .fields()
            .iter()
            .map(|f| f.name.clone().unwrap_or_default())
            .collect();
        return check_data(&Table::new(columns, Vec::new()), resource);
    }

    let mut combined = Table::concat(tables)?;
    let ts_idx = combined
        .index_of(TIMESTAMP_COLUMN)
        .ok_or_else(|| PackageError::SchemaMismatch {
            message: format!("batch tables have no '{TIMESTAMP_COLUMN}' column"),
        })?;
    combined.rows.sort_by(|a, b| a[ts_idx].cmp(&b[ts_idx]));

    let key_idxs = key_columns(&combined, resource, ts_idx)?;
    let before = combined.row_count();

    let mut seen: HashSet<Vec<Cell>> = HashSet::new();
    let mut kept: Vec<Vec<Cell>> = Vec::new();
    for row in combined.rows.into_iter().rev() {
        let key: Vec<Cell> = key_idxs.iter().map(|&i| row[i].clone()).collect();
        if seen.insert(key) {
            kept.push(row);
        }
    }
    kept.reverse();

    let joined = Table::new(combined.columns, kept).without_column(TIMESTAMP_COLUMN);
    tracing::debug!(rows_in = before, rows_out = joined.row_count(), "joined batches");
    check_data(&joined, resource)
}

fn key_columns(table: &Table, resource: &ResourceProperties, ts_idx: usize) -> PackageResult<Vec<usize>> {
    let primary_key = resource.primary_key();
    if primary_key.is_empty() {
        return Ok((0..table.columns.len()).filter(|&i| i != ts_idx).collect());
    }
    primary_key
        .iter()
        .map(|name| {
            table.index_of(name).ok_or_else(|| PackageError::SchemaMismatch {
                message: format!("primary key column '{name}' is not in the data"),
            })
        })
        .collect()
}

/// Read every batch, join them, and write the result to `resources/<name>/data.parquet`.
///
/// Unlike batch files, the data file is derived and is replaced on every call.
pub fn write_resource_data(resource: &ResourceProperties, options: &StoreOptions) -> PackageResult<PathBuf> {
    let result = write_data_impl(resource, options);
    options
        .observe(
            context(StoreOperation::WriteData, resource, result.as_ref().ok().map(|(p, _)| p.clone())),
            result,
            |(_, rows)| StoreStats { rows: *rows, files: 1 },
        )
        .map(|(path, _)| path)
}

fn write_data_impl(resource: &ResourceProperties, options: &StoreOptions) -> PackageResult<(PathBuf, usize)> {
    let tables = read_resource_batches(resource, None, options)?;
    let files = tables.len();
    let joined = join_resource_batches(tables, resource, options)?;
    let name = checked_name(resource, options)?;
    let path = resource_data_file(&options.package_root, name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    write_parquet_table_to_path(&path, &joined)?;
    tracing::debug!(resource = name, batches = files, rows = joined.row_count(), "wrote resource data");
    Ok((path, joined.row_count()))
}

/// Read and validate a resource's reconciled data file.
pub fn read_resource_data(resource: &ResourceProperties, options: &StoreOptions) -> PackageResult<Table> {
    let result = checked_name(resource, options).and_then(|name| {
        let table = read_parquet_table(resource_data_file(&options.package_root, name))?;
        check_data(&table, resource)
    });
    options.observe(context(StoreOperation::ReadData, resource, None), result, |table| {
        StoreStats {
            rows: table.row_count(),
            files: 1,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::{FieldProperties, FieldType, TableSchemaProperties};

    fn resource(primary_key: Option<&str>) -> ResourceProperties {
        let mut schema = TableSchemaProperties::new(vec![
            FieldProperties::new("id", FieldType::Integer),
            FieldProperties::new("v", FieldType::String),
        ]);
        if let Some(key) = primary_key {
            schema = schema.with_primary_key(key);
        }
        ResourceProperties::new("things")
            .with_title("Things")
            .with_description("Some things")
            .with_schema(schema)
    }

    fn batch(ts: &str, rows: &[(&str, &str)]) -> Table {
        let rows: Vec<Vec<Option<&str>>> = rows.iter().map(|(id, v)| vec![Some(*id), Some(*v)]).collect();
        Table::from_rows(&["id", "v"], &rows).with_constant_column(TIMESTAMP_COLUMN, ts)
    }

    #[test]
    fn latest_row_per_key_wins() {
        let opts = StoreOptions::new("unused");
        let joined = join_resource_batches(
            vec![
                batch("2025-02-01T000000Z", &[("0", "new")]),
                batch("2025-01-01T000000Z", &[("0", "old"), ("1", "only")]),
            ],
            &resource(Some("id")),
            &opts,
        )
        .unwrap();
        assert_eq!(joined.columns, vec!["id", "v"]);
        assert_eq!(
            joined.rows,
            vec![
                vec![Some("1".to_string()), Some("only".to_string())],
                vec![Some("0".to_string()), Some("new".to_string())],
            ]
        );
    }

    #[test]
    fn without_a_key_only_exact_duplicates_collapse() {
        let opts = StoreOptions::new("unused");
        let joined = join_resource_batches(
            vec![
                batch("2025-01-01T000000Z", &[("0", "a"), ("0", "b")]),
                batch("2025-02-01T000000Z", &[("0", "a")]),
            ],
            &resource(None),
            &opts,
        )
        .unwrap();
        assert_eq!(joined.row_count(), 2);
        assert_eq!(joined.rows[0][1].as_deref(), Some("b"));
        assert_eq!(joined.rows[1][1].as_deref(), Some("a"));
    }

    #[test]
    fn ties_keep_the_later_input() {
        let opts = StoreOptions::new("unused");
        let joined = join_resource_batches(
            vec![
                batch("2025-01-01T000000Z", &[("0", "first")]),
                batch("2025-01-01T000000Z", &[("0", "second")]),
            ],
            &resource(Some("id")),
            &opts,
        )
        .unwrap();
        assert_eq!(joined.rows, vec![vec![Some("0".to_string()), Some("second".to_string())]]);
    }

    #[test]
    fn ragged_batch_tables_are_an_error_not_a_panic() {
        let opts = StoreOptions::new("unused");
        let ragged = Table::new(
            vec!["id".into(), "v".into(), TIMESTAMP_COLUMN.into()],
            vec![
                vec![Some("1".into())],
                vec![Some("2".into()), Some("a".into()), Some("2025-01-01T000000Z".into())],
            ],
        );
        let err = join_resource_batches(vec![ragged], &resource(Some("id")), &opts).unwrap_err();
        assert!(matches!(err, PackageError::SchemaMismatch { .. }), "{err}");
    }

    #[test]
    fn joining_nothing_gives_an_empty_table() {
        let opts = StoreOptions::new("unused");
        let joined = join_resource_batches(Vec::new(), &resource(Some("id")), &opts).unwrap();
        assert_eq!(joined.columns, vec!["id", "v"]);
        assert_eq!(joined.row_count(), 0);
    }

    #[test]
    fn invalid_properties_fail_before_joining() {
        let opts = StoreOptions::new("unused");
        let bad = ResourceProperties::new("things").with_schema(TableSchemaProperties::new(vec![]));
        let err = join_resource_batches(Vec::new(), &bad, &opts).unwrap_err();
        assert!(matches!(err, PackageError::Properties(_)));
    }
}
