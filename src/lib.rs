//! `data-package-core` manages Frictionless data packages: versioned collections of tabular
//! resources, each with a typed schema and stored as Parquet files.
//!
//! The crate has five parts, leaves first:
//!
//! - [`properties`]: typed package, resource, schema and field metadata, serialized as the
//!   camelCase `datapackage.json` document.
//! - [`check`]: conformance checks of that metadata against the Data Package standard and the
//!   project rules. Every violation is collected as a sorted list of [`check::CheckError`]s.
//! - [`inference`]: the narrowest column type for raw text, over a fixed widening hierarchy.
//!   Used to draft resource properties from CSV input.
//! - [`validation`]: every cell checked against its field's declared type, format and
//!   constraints, with failures grouped per field.
//! - [`batch`]: immutable, timestamped batch files per resource, reconciled into one table with
//!   latest-write-wins on the primary key.
//!
//! Tables are in-memory raw text ([`types::Table`]); [`ingestion`] reads CSV and reads and writes
//! Parquet.
//!
//! ## Quick example: draft properties from a CSV file
//!
//! ```no_run
//! use data_package_core::inference::{infer_csv_properties_from_path, InferenceOptions};
//!
//! # fn main() -> Result<(), data_package_core::PackageError> {
//! let resource = infer_csv_properties_from_path("birds.csv", &InferenceOptions::default())?;
//! for field in resource.fields() {
//!     println!("{:?}: {:?}", field.name, field.field_type);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Quick example: validate data
//!
//! ```rust
//! use data_package_core::properties::{FieldProperties, FieldType, ResourceProperties, TableSchemaProperties};
//! use data_package_core::types::Table;
//! use data_package_core::validation::check_data;
//! use data_package_core::PackageError;
//!
//! let resource = ResourceProperties::new("visits").with_schema(TableSchemaProperties::new(vec![
//!     FieldProperties::new("day", FieldType::Date),
//! ]));
//! let table = Table::from_rows(&["day"], &[vec![Some("2002-13-10")]]);
//!
//! match check_data(&table, &resource) {
//!     Err(PackageError::Data(group)) => assert_eq!(group.errors[0].rows(), vec![0]),
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```

pub mod batch;
pub mod check;
pub mod error;
pub mod inference;
pub mod ingestion;
pub mod paths;
pub mod properties;
pub mod types;
pub mod validation;

pub use error::{PackageError, PackageResult};
