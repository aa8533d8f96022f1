//! Outcome reporting for batch store operations.
//!
//! Every public store call reports once to the [`StoreObserver`] configured on
//! `StoreOptions`: success with [`StoreStats`], or failure with a [`StoreSeverity`]. Failures at
//! or above the alert threshold are also passed to [`StoreObserver::on_alert`].

use std::error::Error as StdError;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::PackageError;

/// Severity of a failed store operation, used for alerting thresholds.
///
/// Successes are reported through [`StoreObserver::on_success`] and carry no severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StoreSeverity {
    /// The operation failed on its input (bad properties, bad data, bad file name).
    Error,
    /// The operation failed on the file system.
    Critical,
}

/// Batch store operations reported to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOperation {
    /// `write_resource_batch`
    WriteBatch,
    /// `read_resource_batches`
    ReadBatches,
    /// `join_resource_batches`
    JoinBatches,
    /// `write_resource_data`
    WriteData,
    /// `read_resource_data`
    ReadData,
}

/// What an observed operation was working on.
#[derive(Debug, Clone)]
pub struct StoreContext {
    /// The store call that finished.
    pub operation: StoreOperation,
    /// Resource name, or empty when the properties have none.
    pub resource: String,
    /// The file written or read, when there is a single one.
    pub path: Option<PathBuf>,
}

/// Reported on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Rows written, read or left after joining.
    pub rows: usize,
    /// Number of batch or data files touched.
    pub files: usize,
}

/// Observer interface for batch store outcomes.
///
/// All methods default to no-ops, so an observer implements only what it needs.
pub trait StoreObserver: Send + Sync {
    /// Called after an operation succeeds.
    fn on_success(&self, _ctx: &StoreContext, _stats: StoreStats) {}

    /// Called after an operation fails, whatever the severity.
    fn on_failure(&self, _ctx: &StoreContext, _severity: StoreSeverity, _error: &PackageError) {}

    /// Called when a failure meets the alert threshold. Forwards to [`Self::on_failure`] by
    /// default.
    fn on_alert(&self, ctx: &StoreContext, severity: StoreSeverity, error: &PackageError) {
        self.on_failure(ctx, severity, error)
    }
}

/// Fans callbacks out to several observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn StoreObserver>>,
}

impl CompositeObserver {
    /// Forward every callback to each of `observers`, in order.
    pub fn new(observers: Vec<Arc<dyn StoreObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl StoreObserver for CompositeObserver {
    fn on_success(&self, ctx: &StoreContext, stats: StoreStats) {
        self.observers.iter().for_each(|o| o.on_success(ctx, stats));
    }

    fn on_failure(&self, ctx: &StoreContext, severity: StoreSeverity, error: &PackageError) {
        self.observers.iter().for_each(|o| o.on_failure(ctx, severity, error));
    }

    fn on_alert(&self, ctx: &StoreContext, severity: StoreSeverity, error: &PackageError) {
        self.observers.iter().for_each(|o| o.on_alert(ctx, severity, error));
    }
}

fn describe(ctx: &StoreContext) -> String {
    match &ctx.path {
        Some(path) => format!("op={:?} resource={} path={}", ctx.operation, ctx.resource, path.display()),
        None => format!("op={:?} resource={}", ctx.operation, ctx.resource),
    }
}

/// Logs store events to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl StoreObserver for StdErrObserver {
    fn on_success(&self, ctx: &StoreContext, stats: StoreStats) {
        eprintln!("[store][ok] {} rows={} files={}", describe(ctx), stats.rows, stats.files);
    }

    fn on_failure(&self, ctx: &StoreContext, severity: StoreSeverity, error: &PackageError) {
        eprintln!("[store][{severity:?}] {} err={error}", describe(ctx));
    }

    fn on_alert(&self, ctx: &StoreContext, severity: StoreSeverity, error: &PackageError) {
        eprintln!("[ALERT][store][{severity:?}] {} err={error}", describe(ctx));
    }
}

/// Appends store events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Writes are best-effort; a log file that cannot be opened is ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl StoreObserver for FileObserver {
    fn on_success(&self, ctx: &StoreContext, stats: StoreStats) {
        self.append_line(&format!(
            "{} ok {} rows={} files={}",
            unix_ts(),
            describe(ctx),
            stats.rows,
            stats.files
        ));
    }

    fn on_failure(&self, ctx: &StoreContext, severity: StoreSeverity, error: &PackageError) {
        self.append_line(&format!(
            "{} fail severity={severity:?} {} err={}",
            unix_ts(),
            describe(ctx),
            one_line(error)
        ));
    }

    fn on_alert(&self, ctx: &StoreContext, severity: StoreSeverity, error: &PackageError) {
        self.append_line(&format!(
            "{} ALERT severity={severity:?} {} err={}",
            unix_ts(),
            describe(ctx),
            one_line(error)
        ));
    }
}

// Grouped errors span several lines; the log keeps one event per line.
fn one_line(error: &PackageError) -> String {
    error.to_string().lines().map(str::trim).collect::<Vec<_>>().join("; ")
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// I/O failures anywhere in the chain are critical; everything else is an input error.
pub fn severity_for_error(e: &PackageError) -> StoreSeverity {
    match e {
        PackageError::Io(_) => StoreSeverity::Critical,
        PackageError::Parquet(err) if error_chain_contains_io(err) => StoreSeverity::Critical,
        PackageError::Csv(err) if matches!(err.kind(), ::csv::ErrorKind::Io(_)) => StoreSeverity::Critical,
        _ => StoreSeverity::Error,
    }
}

fn error_chain_contains_io(e: &(dyn StdError + 'static)) -> bool {
    let mut cur: Option<&(dyn StdError + 'static)> = Some(e);
    while let Some(err) = cur {
        if err.is::<std::io::Error>() {
            return true;
        }
        cur = err.source();
    }
    false
}
