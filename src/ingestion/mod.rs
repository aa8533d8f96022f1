//! Reading and writing raw-text tables.
//!
//! - [`csv`] reads the raw input used for type inference, detecting the delimiter when it is not
//!   configured.
//! - [`parquet`] is the storage format for batch files and reconciled resource data.

pub mod csv;
pub mod parquet;

pub use self::csv::{CsvOptions, read_csv_table, read_csv_table_from_path, sniff_delimiter};
pub use self::parquet::{read_parquet_table, write_parquet_table, write_parquet_table_to_path};
