//! Per-field validation of table data against resource properties.
//!
//! [`check_data`] runs in three steps:
//!
//! 1. The table's columns must be exactly the resource's fields (in any order). Every extra and
//!    every missing column is reported at once, before any cell is looked at.
//! 2. Missing-value tokens become nulls. A field's own `missingValues` wins over the schema's,
//!    which wins over the default `[""]`; the lists are never merged.
//! 3. Every remaining cell is checked against its field's type and format, and every cell
//!    against the field's constraints (`required`, `unique`, `enum`).
//!
//! Failures are collected per field, so a caller sees at most one [`FieldError`] per bad field.

pub mod formats;

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use crate::error::{PackageError, PackageResult};
use crate::properties::{FieldProperties, FieldType, ResourceProperties};
use crate::types::{Cell, Table};

pub use formats::{BOOLEAN_TOKENS, FormatChecker, TimezoneMode};

/// Missing-value tokens used when neither the field nor the schema sets any.
pub const DEFAULT_MISSING_VALUES: [&str; 1] = [""];

/// One rejected cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellFailure {
    /// Zero-based row index.
    pub row: usize,
    /// The raw cell as it appeared in the input.
    pub value: Cell,
    pub reason: String,
}

impl fmt::Display for CellFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(v) => write!(f, "row {}: '{}' ({})", self.row, v, self.reason),
            None => write!(f, "row {}: null ({})", self.row, self.reason),
        }
    }
}

/// Every failing cell of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub name: String,
    /// The declared type; `None` means "any".
    pub field_type: Option<FieldType>,
    pub failures: Vec<CellFailure>,
}

impl FieldError {
    /// Row indexes that failed, ascending. A row appears once even if it failed several checks.
    pub fn rows(&self) -> Vec<usize> {
        self.failures
            .iter()
            .map(|f| f.row)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ty = self.field_type.map(|t| t.as_str()).unwrap_or("any");
        write!(f, "field '{}' ({ty}): {} invalid value(s)", self.name, self.failures.len())?;
        for failure in &self.failures {
            write!(f, "\n    {failure}")?;
        }
        Ok(())
    }
}

/// All field errors found in one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataErrorGroup {
    pub errors: Vec<FieldError>,
}

impl DataErrorGroup {
    pub fn field(&self, name: &str) -> Option<&FieldError> {
        self.errors.iter().find(|e| e.name == name)
    }
}

impl fmt::Display for DataErrorGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data failed checks in {} field(s):", self.errors.len())?;
        for e in &self.errors {
            write!(f, "\n  {e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for DataErrorGroup {}

/// The missing-value tokens that apply to `field`.
pub fn missing_values_for(field: &FieldProperties, resource: &ResourceProperties) -> Vec<String> {
    if let Some(tokens) = &field.missing_values {
        return tokens.clone();
    }
    if let Some(tokens) = resource.schema.as_ref().and_then(|s| s.missing_values.as_ref()) {
        return tokens.clone();
    }
    DEFAULT_MISSING_VALUES.iter().map(|t| t.to_string()).collect()
}

/// The text a cell must have to equal an `enum` member: strings as-is, other JSON values in
/// their serialized form (`1`, `true`, `1.5`).
pub fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Check that the table's columns are exactly the resource's fields and that every row has one
/// cell per column.
///
/// A column name that occurs more than once counts as extra. A row of the wrong width is a
/// [`PackageError::SchemaMismatch`] naming the first such row.
pub fn check_columns(table: &Table, resource: &ResourceProperties) -> PackageResult<()> {
    let fields: BTreeSet<&str> = resource
        .fields()
        .iter()
        .map(|f| f.name.as_deref().unwrap_or_default())
        .collect();

    let mut seen: HashSet<&str> = HashSet::new();
    let mut extra: BTreeSet<String> = BTreeSet::new();
    for column in &table.columns {
        if !fields.contains(column.as_str()) || !seen.insert(column.as_str()) {
            extra.insert(column.clone());
        }
    }
    let missing: Vec<String> = fields
        .iter()
        .filter(|f| !seen.contains(*f))
        .map(|f| f.to_string())
        .collect();

    if !(extra.is_empty() && missing.is_empty()) {
        return Err(PackageError::ColumnMismatch {
            extra: extra.into_iter().collect(),
            missing,
        });
    }
    table.check_row_widths()
}

/// Validate `table` against `resource` and return it with missing values turned into nulls.
///
/// Errors: [`PackageError::ColumnMismatch`] when the column set is wrong, otherwise
/// [`PackageError::Data`] listing every failing cell grouped by field.
pub fn check_data(table: &Table, resource: &ResourceProperties) -> PackageResult<Table> {
    check_columns(table, resource)?;

    let mut normalized = table.clone();
    let mut errors = Vec::new();

    for field in resource.fields() {
        let name = field.name.as_deref().unwrap_or_default();
        let Some(idx) = table.index_of(name) else {
            continue;
        };
        let tokens = missing_values_for(field, resource);

        let mut failures = Vec::new();
        let mut checker = FormatChecker::new(field.field_type, field.format.as_deref());
        let constraints = field.constraints.clone().unwrap_or_default();
        let allowed: Option<Vec<String>> = constraints
            .enum_values
            .as_ref()
            .map(|values| values.iter().map(value_text).collect());
        let mut seen: HashSet<String> = HashSet::new();

        for (row_idx, row) in normalized.rows.iter_mut().enumerate() {
            let Some(cell) = row.get_mut(idx) else {
                continue;
            };
            let raw = cell.clone();
            if cell.as_ref().is_some_and(|v| tokens.iter().any(|t| t == v)) {
                *cell = None;
            }

            let mut fail = |reason: String| {
                failures.push(CellFailure {
                    row: row_idx,
                    value: raw.clone(),
                    reason,
                })
            };

            let Some(value) = cell.as_deref() else {
                if constraints.required == Some(true) {
                    fail("value is required".to_string());
                }
                continue;
            };

            if let Err(reason) = checker.check(value) {
                fail(reason);
            }
            if let Some(allowed) = &allowed {
                if !allowed.iter().any(|a| a == value) {
                    fail(format!("not one of the allowed values [{}]", allowed.join(", ")));
                }
            }
            if constraints.unique == Some(true) && !seen.insert(value.to_string()) {
                fail("duplicate value".to_string());
            }
        }

        if !failures.is_empty() {
            errors.push(FieldError {
                name: name.to_string(),
                field_type: field.field_type,
                failures,
            });
        }
    }

    if errors.is_empty() {
        tracing::debug!(rows = table.row_count(), columns = table.columns.len(), "data passed checks");
        Ok(normalized)
    } else {
        tracing::debug!(fields = errors.len(), "data failed checks");
        Err(DataErrorGroup { errors }.into())
    }
}
