//! Parquet storage for raw-text tables.
//!
//! Every column is written as an optional UTF-8 byte array, so a table survives a round trip
//! exactly, nulls included.

use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use parquet::basic::{LogicalType, Repetition, Type as PhysicalType};
use parquet::column::writer::ColumnWriter;
use parquet::data_type::ByteArray;
use parquet::file::properties::WriterProperties;
use parquet::file::reader::FileReader;
use parquet::file::serialized_reader::SerializedFileReader;
use parquet::file::writer::SerializedFileWriter;
use parquet::record::Field;
use parquet::schema::types::Type;

use crate::error::{PackageError, PackageResult};
use crate::types::{Cell, Table};

fn string_schema(columns: &[String]) -> PackageResult<Type> {
    let fields = columns
        .iter()
        .map(|name| {
            Type::primitive_type_builder(name, PhysicalType::BYTE_ARRAY)
                .with_repetition(Repetition::OPTIONAL)
                .with_logical_type(Some(LogicalType::String))
                .build()
                .map(Arc::new)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Type::group_type_builder("schema").with_fields(fields).build()?)
}

/// Write `table` as a single row group to `sink`.
pub fn write_parquet_table<W: Write + Send>(sink: W, table: &Table) -> PackageResult<()> {
    let schema = Arc::new(string_schema(&table.columns)?);
    let props = Arc::new(WriterProperties::builder().build());
    let mut writer = SerializedFileWriter::new(sink, schema, props)?;

    let mut rg = writer.next_row_group()?;
    let mut col_idx: usize = 0;
    while let Some(mut col) = rg.next_column()? {
        let mut values: Vec<ByteArray> = Vec::with_capacity(table.row_count());
        let mut defs: Vec<i16> = Vec::with_capacity(table.row_count());
        for cell in table.column(col_idx) {
            match cell {
                Some(v) => {
                    values.push(ByteArray::from(v));
                    defs.push(1);
                }
                None => defs.push(0),
            }
        }

        match col.untyped() {
            ColumnWriter::ByteArrayColumnWriter(w) => {
                w.write_batch(&values, Some(&defs), None)?;
            }
            _ => {
                return Err(PackageError::SchemaMismatch {
                    message: format!("column {col_idx} is not a byte array column"),
                });
            }
        }
        col.close()?;
        col_idx += 1;
    }
    rg.close()?;
    writer.close()?;
    Ok(())
}

/// Write `table` to a new file at `path`, replacing any existing file.
pub fn write_parquet_table_to_path(path: impl AsRef<Path>, table: &Table) -> PackageResult<()> {
    let file = File::create(path)?;
    write_parquet_table(file, table)
}

/// Read a Parquet file into a [`Table`].
///
/// String columns come back as-is; any other physical type is rendered as text.
pub fn read_parquet_table(path: impl AsRef<Path>) -> PackageResult<Table> {
    let reader = SerializedFileReader::new(File::open(path)?)?;

    let columns: Vec<String> = reader
        .metadata()
        .file_metadata()
        .schema_descr()
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    let positions: HashMap<&str, usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| (c.as_str(), i))
        .collect();

    let mut rows: Vec<Vec<Cell>> = Vec::new();
    for row_res in reader.into_iter() {
        let row = row_res?;
        let mut out: Vec<Cell> = vec![None; columns.len()];
        for (name, field) in row.get_column_iter() {
            if let Some(&idx) = positions.get(name.as_str()) {
                out[idx] = field_to_cell(field);
            }
        }
        rows.push(out);
    }

    Ok(Table::new(columns, rows))
}

fn field_to_cell(field: &Field) -> Cell {
    match field {
        Field::Null => None,
        Field::Str(s) => Some(s.clone()),
        Field::Bytes(b) => match b.as_utf8() {
            Ok(s) => Some(s.to_string()),
            Err(_) => Some(field.to_string()),
        },
        other => Some(other.to_string()),
    }
}
