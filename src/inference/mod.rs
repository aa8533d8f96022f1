//! Column type inference over raw text cells.
//!
//! Every column starts as the narrowest type in [`InferredType::HIERARCHY`] and widens to the
//! first type (from its current position onwards) that parses the next non-empty value. The type
//! never narrows, and once a column is `str` it stays `str`.
//!
//! ```rust
//! use data_package_core::inference::{ColumnTypeStats, InferredType};
//!
//! let mut stats = ColumnTypeStats::new("score");
//! for value in ["1", "2", "2.2"] {
//!     stats.analyze(Some(value));
//! }
//! assert_eq!(stats.inferred_type(), InferredType::Float);
//! ```

mod parse;

use std::io::Read;
use std::path::Path;

use crate::error::PackageResult;
use crate::ingestion::csv::{CsvOptions, read_csv_table, read_csv_table_from_path};
use crate::properties::{
    ConstraintsProperties, FieldProperties, FieldType, ResourceProperties, TableSchemaProperties,
    is_valid_name,
};
use crate::types::Table;

pub use parse::{Parsed, Rejection, parse_as};

/// Candidate column types, narrowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InferredType {
    Bool,
    Int,
    Float,
    Time,
    Date,
    Datetime,
    Str,
}

impl InferredType {
    /// The fixed search order. `Str` accepts everything.
    pub const HIERARCHY: [InferredType; 7] = [
        InferredType::Bool,
        InferredType::Int,
        InferredType::Float,
        InferredType::Time,
        InferredType::Date,
        InferredType::Datetime,
        InferredType::Str,
    ];

    /// Position in [`Self::HIERARCHY`].
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InferredType::Bool => "bool",
            InferredType::Int => "int",
            InferredType::Float => "float",
            InferredType::Time => "time",
            InferredType::Date => "date",
            InferredType::Datetime => "datetime",
            InferredType::Str => "str",
        }
    }

    /// The Frictionless field type used when writing inferred properties.
    pub fn field_type(self) -> FieldType {
        match self {
            InferredType::Bool => FieldType::Boolean,
            InferredType::Int => FieldType::Integer,
            InferredType::Float => FieldType::Number,
            InferredType::Time => FieldType::Time,
            InferredType::Date => FieldType::Date,
            InferredType::Datetime => FieldType::Datetime,
            InferredType::Str => FieldType::String,
        }
    }
}

impl std::fmt::Display for InferredType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Running type state for one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnTypeStats {
    pub name: String,
    current: InferredType,
    rows: usize,
    has_empty: bool,
}

impl ColumnTypeStats {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            current: InferredType::HIERARCHY[0],
            rows: 0,
            has_empty: false,
        }
    }

    /// Feed one cell. `None` and blank cells only mark the column as having empty values.
    pub fn analyze(&mut self, value: Option<&str>) {
        self.rows += 1;
        let value = match value.map(str::trim) {
            Some(v) if !v.is_empty() => v,
            _ => {
                self.has_empty = true;
                return;
            }
        };
        if self.current == InferredType::Str {
            return;
        }

        let start = self.current.index();
        let next = InferredType::HIERARCHY[start..]
            .iter()
            .copied()
            .find(|ty| parse_as(*ty, value).is_ok())
            .unwrap_or(InferredType::Str);

        if next != self.current {
            tracing::trace!(column = %self.name, from = %self.current, to = %next, value, "widened column type");
            self.current = next;
        }
    }

    pub fn inferred_type(&self) -> InferredType {
        self.current
    }

    /// Number of cells analyzed, empty ones included.
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn has_empty(&self) -> bool {
        self.has_empty
    }

    /// Field properties describing this column.
    pub fn to_field(&self) -> FieldProperties {
        let field = FieldProperties::new(self.name.clone(), self.current.field_type());
        if self.rows > 0 && !self.has_empty {
            field.with_constraints(ConstraintsProperties {
                required: Some(true),
                ..Default::default()
            })
        } else {
            field
        }
    }
}

/// Options for inferring properties from CSV input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceOptions {
    /// Field delimiter. `None` detects it from the input.
    pub delimiter: Option<u8>,
    /// Maximum number of data rows scanned.
    pub max_rows: usize,
}

impl Default for InferenceOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            max_rows: 500,
        }
    }
}

impl InferenceOptions {
    fn csv_options(&self) -> CsvOptions {
        CsvOptions {
            delimiter: self.delimiter,
            max_rows: Some(self.max_rows),
        }
    }
}

/// Run the inference state machine over every column of `table`.
pub fn infer_table_types(table: &Table) -> Vec<ColumnTypeStats> {
    table
        .columns
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let mut stats = ColumnTypeStats::new(name.clone());
            for value in table.column(idx) {
                stats.analyze(value);
            }
            stats
        })
        .collect()
}

/// Infer resource properties (format, encoding and a typed schema) from CSV text.
pub fn infer_csv_properties<R: Read>(reader: R, options: &InferenceOptions) -> PackageResult<ResourceProperties> {
    let table = read_csv_table(reader, &options.csv_options())?;
    Ok(properties_from_table(&table))
}

/// Infer resource properties from a CSV file. The name is derived from the file stem.
pub fn infer_csv_properties_from_path(
    path: impl AsRef<Path>,
    options: &InferenceOptions,
) -> PackageResult<ResourceProperties> {
    let path = path.as_ref();
    let table = read_csv_table_from_path(path, &options.csv_options())?;
    let mut resource = properties_from_table(&table);
    if let Some(name) = path.file_stem().and_then(|s| s.to_str()).map(name_from_stem) {
        if is_valid_name(&name) {
            resource.set_name(name);
        }
    }
    Ok(resource)
}

fn properties_from_table(table: &Table) -> ResourceProperties {
    let fields = infer_table_types(table).iter().map(ColumnTypeStats::to_field).collect();
    tracing::debug!(columns = table.columns.len(), rows = table.row_count(), "inferred csv schema");
    let mut resource = ResourceProperties::default().with_schema(TableSchemaProperties::new(fields));
    resource.format = Some("csv".to_string());
    resource.mediatype = Some("text/csv".to_string());
    resource.encoding = Some("utf-8".to_string());
    resource
}

fn name_from_stem(stem: &str) -> String {
    stem.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '-' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn infer(values: &[Option<&str>]) -> ColumnTypeStats {
        let mut stats = ColumnTypeStats::new("col");
        for v in values {
            stats.analyze(*v);
        }
        stats
    }

    #[test]
    fn widens_through_the_hierarchy() {
        assert_eq!(infer(&[Some("yes"), Some("N")]).inferred_type(), InferredType::Bool);
        assert_eq!(infer(&[Some("1"), Some("42")]).inferred_type(), InferredType::Int);
        assert_eq!(infer(&[Some("1"), Some("4.2")]).inferred_type(), InferredType::Float);
        assert_eq!(infer(&[Some("12:30"), Some("08:15:00")]).inferred_type(), InferredType::Time);
        assert_eq!(infer(&[Some("2024-01-31")]).inferred_type(), InferredType::Date);
        assert_eq!(
            infer(&[Some("2024-01-31"), Some("2024-02-01 10:00:00")]).inferred_type(),
            InferredType::Datetime
        );
        assert_eq!(infer(&[Some("12:30"), Some("lunch")]).inferred_type(), InferredType::Str);
    }

    #[test]
    fn never_narrows_again() {
        let stats = infer(&[Some("2.5"), Some("1"), Some("0")]);
        assert_eq!(stats.inferred_type(), InferredType::Float);
    }

    #[test]
    fn empty_values_only_set_the_flag() {
        let stats = infer(&[Some("1"), None, Some("  "), Some("2")]);
        assert_eq!(stats.inferred_type(), InferredType::Int);
        assert!(stats.has_empty());
        assert_eq!(stats.rows(), 4);
        assert!(!stats.to_field().is_required());
    }

    #[test]
    fn values_are_trimmed_before_parsing() {
        assert_eq!(infer(&[Some(" 7 ")]).inferred_type(), InferredType::Int);
    }

    #[test]
    fn table_inference_maps_to_field_types() {
        let table = Table::from_rows(
            &["id", "when", "note"],
            &[
                vec![Some("1"), Some("2024-01-01"), Some("a")],
                vec![Some("2"), Some("2024-01-02"), Some("")],
            ],
        );
        let props = properties_from_table(&table);
        let fields = props.fields();
        assert_eq!(fields[0].field_type, Some(FieldType::Integer));
        assert!(fields[0].is_required());
        assert_eq!(fields[1].field_type, Some(FieldType::Date));
        assert_eq!(fields[2].field_type, Some(FieldType::String));
        assert!(!fields[2].is_required());
    }

    #[test]
    fn stem_becomes_a_valid_name() {
        assert_eq!(name_from_stem("Bird Counts 2024"), "bird-counts-2024");
    }
}
