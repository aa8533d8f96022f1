//! In-memory table type shared by validation, inference and the batch store.
//!
//! Cells keep their raw text: a Frictionless type describes how a value is *written*, so every
//! check operates on the text itself. `None` is a null (missing) cell.

use std::collections::HashMap;

use crate::error::{PackageError, PackageResult};

/// A single raw cell. `None` is a null value.
pub type Cell = Option<String>;

/// In-memory tabular data.
///
/// Rows are stored as `Vec<Vec<Cell>>` in the same order as [`Table::columns`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    /// Ordered column names.
    pub columns: Vec<String>,
    /// Row-major cell storage.
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Create a table from column names and rows.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { columns, rows }
    }

    /// Build a table from string literals; `None` cells are nulls.
    pub fn from_rows<S: AsRef<str>>(columns: &[&str], rows: &[Vec<Option<S>>]) -> Self {
        Self {
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|cell| cell.as_ref().map(|s| s.as_ref().to_string()))
                        .collect()
                })
                .collect(),
        }
    }

    /// Number of rows in the table.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns the index of a column by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Iterate the cells of column `idx` in row order.
    pub fn column(&self, idx: usize) -> impl Iterator<Item = Option<&str>> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(idx).and_then(|c| c.as_deref()))
    }

    /// Append a column holding `value` in every row.
    pub fn with_constant_column(mut self, name: &str, value: &str) -> Self {
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(Some(value.to_string()));
        }
        self
    }

    /// Remove a column by name. Returns the table unchanged if it does not exist.
    pub fn without_column(mut self, name: &str) -> Self {
        if let Some(idx) = self.index_of(name) {
            self.columns.remove(idx);
            for row in &mut self.rows {
                if idx < row.len() {
                    row.remove(idx);
                }
            }
        }
        self
    }

    /// Fail with [`PackageError::SchemaMismatch`] on the first row whose width differs from the
    /// number of columns.
    pub fn check_row_widths(&self) -> PackageResult<()> {
        let width = self.columns.len();
        match self.rows.iter().position(|row| row.len() != width) {
            Some(row) => Err(PackageError::SchemaMismatch {
                message: format!(
                    "row {row} has {} cell(s) but the table has {width} column(s)",
                    self.rows[row].len()
                ),
            }),
            None => Ok(()),
        }
    }

    /// Concatenate tables vertically.
    ///
    /// Columns are matched by name, so the inputs may order them differently; the first table's
    /// column order wins. All tables must share the same column set and every row must have
    /// one cell per column.
    pub fn concat(tables: Vec<Table>) -> PackageResult<Table> {
        let mut iter = tables.into_iter();
        let Some(first) = iter.next() else {
            return Ok(Table::default());
        };
        first.check_row_widths()?;

        let mut out = first;
        for table in iter {
            table.check_row_widths()?;
            if table.columns.len() != out.columns.len() {
                return Err(PackageError::SchemaMismatch {
                    message: format!(
                        "cannot concatenate tables with columns {:?} and {:?}",
                        out.columns, table.columns
                    ),
                });
            }
            let positions: HashMap<&str, usize> = table
                .columns
                .iter()
                .enumerate()
                .map(|(i, c)| (c.as_str(), i))
                .collect();
            let mut order = Vec::with_capacity(out.columns.len());
            for c in &out.columns {
                let idx = positions.get(c.as_str()).ok_or_else(|| PackageError::SchemaMismatch {
                    message: format!(
                        "cannot concatenate tables with columns {:?} and {:?}",
                        out.columns, table.columns
                    ),
                })?;
                order.push(*idx);
            }
            for row in table.rows {
                out.rows.push(order.iter().map(|&i| row[i].clone()).collect());
            }
        }
        Ok(out)
    }
}
