//! Typed package, resource, schema and field metadata.
//!
//! These types mirror the table-shaped subset of the Frictionless Data Package standard. Field
//! names are snake_case in Rust and camelCase in JSON. Every optional attribute is an `Option`
//! that is omitted from the serialized document when unset.

mod io;

use chrono::{SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::paths::resource_data_path;

pub use io::{read_properties, write_properties};

/// Pattern every package and resource name must match.
pub const NAME_PATTERN: &str = r"^[a-z0-9._-]+$";

static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(NAME_PATTERN).expect("valid name regex"));

/// Version assigned by [`create_package_properties`] when none is set.
pub const INITIAL_VERSION: &str = "0.1.0";

/// Returns `true` if `name` is usable as a package or resource name.
pub fn is_valid_name(name: &str) -> bool {
    NAME_RE.is_match(name)
}

/// Metadata for a whole data package (`datapackage.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// ISO-8601 creation timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contributors: Option<Vec<ContributorProperties>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub licenses: Option<Vec<LicenseProperties>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<SourceProperties>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<ResourceProperties>>,
}

impl PackageProperties {
    /// Find a resource by name.
    pub fn resource(&self, name: &str) -> Option<&ResourceProperties> {
        self.resources
            .as_deref()
            .unwrap_or_default()
            .iter()
            .find(|r| r.name() == Some(name))
    }
}

/// A person or organisation that contributed to a package.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributorProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Metadata for one tabular resource.
///
/// `path` is derived from `name`: it is always `resources/<name>/data.parquet` when the name is
/// well-formed and unset otherwise. Use [`ResourceProperties::set_name`] to keep the two in sync.
/// There is no `data` attribute: resources never carry inline data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mediatype: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<TableSchemaProperties>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<SourceProperties>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub licenses: Option<Vec<LicenseProperties>>,
}

impl ResourceProperties {
    /// Create resource properties with `name` (and the matching derived `path`).
    pub fn new(name: impl Into<String>) -> Self {
        let mut resource = Self::default();
        resource.set_name(name);
        resource
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The derived data path, set only while the name is well-formed.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Rename the resource and recompute its path.
    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.path = is_valid_name(&name).then(|| resource_data_path(&name));
        self.name = Some(name);
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_schema(mut self, schema: TableSchemaProperties) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Declared fields, or an empty slice when there is no schema.
    pub fn fields(&self) -> &[FieldProperties] {
        self.schema
            .as_ref()
            .and_then(|s| s.fields.as_deref())
            .unwrap_or_default()
    }

    /// Primary key field names, or an empty list when none is declared.
    pub fn primary_key(&self) -> Vec<String> {
        match self.schema.as_ref().and_then(|s| s.primary_key.as_ref()) {
            Some(PrimaryKey::Single(name)) => vec![name.clone()],
            Some(PrimaryKey::Composite(names)) => names.clone(),
            None => Vec::new(),
        }
    }
}

/// The table schema of a resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSchemaProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldProperties>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_values: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<PrimaryKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_keys: Option<Vec<Vec<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreign_keys: Option<Vec<ForeignKeyProperties>>,
}

impl TableSchemaProperties {
    pub fn new(fields: Vec<FieldProperties>) -> Self {
        Self {
            fields: Some(fields),
            ..Default::default()
        }
    }

    pub fn with_primary_key(mut self, key: impl Into<PrimaryKey>) -> Self {
        self.primary_key = Some(key.into());
        self
    }
}

/// A primary key: one field name or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryKey {
    Single(String),
    Composite(Vec<String>),
}

impl From<&str> for PrimaryKey {
    fn from(name: &str) -> Self {
        PrimaryKey::Single(name.to_string())
    }
}

impl From<Vec<String>> for PrimaryKey {
    fn from(names: Vec<String>) -> Self {
        PrimaryKey::Composite(names)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyProperties {
    pub fields: Vec<String>,
    pub reference: ForeignKeyReference,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyReference {
    pub resource: String,
    pub fields: Vec<String>,
}

/// Metadata for one column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Unset means "any".
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub field_type: Option<FieldType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// An example value, in any JSON form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraints: Option<ConstraintsProperties>,
    /// Overrides the schema's missing values. `Some(vec![])` disables substitution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_values: Option<Vec<String>>,
}

impl FieldProperties {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: Some(name.into()),
            field_type: Some(field_type),
            ..Default::default()
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_constraints(mut self, constraints: ConstraintsProperties) -> Self {
        self.constraints = Some(constraints);
        self
    }

    pub fn with_missing_values(mut self, tokens: Vec<String>) -> Self {
        self.missing_values = Some(tokens);
        self
    }

    pub fn is_required(&self) -> bool {
        self.constraints
            .as_ref()
            .and_then(|c| c.required)
            .unwrap_or(false)
    }
}

/// The Frictionless field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
    Datetime,
    Date,
    Time,
    Year,
    Yearmonth,
    Duration,
    Geopoint,
    Geojson,
    Any,
}

impl FieldType {
    pub const ALL: [FieldType; 15] = [
        FieldType::String,
        FieldType::Number,
        FieldType::Integer,
        FieldType::Boolean,
        FieldType::Object,
        FieldType::Array,
        FieldType::Datetime,
        FieldType::Date,
        FieldType::Time,
        FieldType::Year,
        FieldType::Yearmonth,
        FieldType::Duration,
        FieldType::Geopoint,
        FieldType::Geojson,
        FieldType::Any,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
            FieldType::Object => "object",
            FieldType::Array => "array",
            FieldType::Datetime => "datetime",
            FieldType::Date => "date",
            FieldType::Time => "time",
            FieldType::Year => "year",
            FieldType::Yearmonth => "yearmonth",
            FieldType::Duration => "duration",
            FieldType::Geopoint => "geopoint",
            FieldType::Geojson => "geojson",
            FieldType::Any => "any",
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field constraints. Only `required`, `unique` and `enum` are enforced on data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintsProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique: Option<bool>,
    /// Allowed values. Members may be any JSON value; cells are compared with their text form.
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// Fill in the attributes a new package gets automatically.
///
/// Sets `id` to a random UUID, `version` to [`INITIAL_VERSION`] and `created` to the current UTC
/// time when they are unset; values the caller already set are kept.
pub fn create_package_properties(mut properties: PackageProperties) -> PackageProperties {
    if properties.id.is_none() {
        properties.id = Some(Uuid::new_v4().to_string());
    }
    if properties.version.is_none() {
        properties.version = Some(INITIAL_VERSION.to_string());
    }
    if properties.created.is_none() {
        properties.created = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));
    }
    properties
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_follows_name() {
        let mut resource = ResourceProperties::new("birds");
        assert_eq!(resource.path(), Some("resources/birds/data.parquet"));

        resource.set_name("fish");
        assert_eq!(resource.path(), Some("resources/fish/data.parquet"));

        resource.set_name("Not A Name");
        assert_eq!(resource.path(), None);
        assert_eq!(resource.name(), Some("Not A Name"));
    }

    #[test]
    fn serialization_omits_unset_fields_and_uses_camel_case() {
        let resource = ResourceProperties::new("birds").with_schema(
            TableSchemaProperties::new(vec![
                FieldProperties::new("id", FieldType::Integer).with_missing_values(vec![]),
            ])
            .with_primary_key("id"),
        );

        let json = serde_json::to_value(&resource).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "birds",
                "path": "resources/birds/data.parquet",
                "schema": {
                    "fields": [{"name": "id", "type": "integer", "missingValues": []}],
                    "primaryKey": "id"
                }
            })
        );
    }

    #[test]
    fn primary_key_accepts_string_or_list() {
        let single: TableSchemaProperties =
            serde_json::from_value(serde_json::json!({"primaryKey": "id"})).unwrap();
        let composite: TableSchemaProperties =
            serde_json::from_value(serde_json::json!({"primaryKey": ["a", "b"]})).unwrap();

        assert_eq!(single.primary_key, Some(PrimaryKey::Single("id".into())));
        assert_eq!(
            composite.primary_key,
            Some(PrimaryKey::Composite(vec!["a".into(), "b".into()]))
        );
    }

    #[test]
    fn create_keeps_existing_values() {
        let props = create_package_properties(PackageProperties {
            version: Some("2.0.0".into()),
            ..Default::default()
        });

        assert_eq!(props.version.as_deref(), Some("2.0.0"));
        assert!(props.id.as_deref().is_some_and(|id| Uuid::parse_str(id).is_ok()));
        assert!(props.created.as_deref().is_some_and(|c| c.ends_with('Z')));
    }
}
