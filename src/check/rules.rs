//! Project rules that the standard schema cannot express: required fields beyond the standard's,
//! blank values, the derived resource path, and the ban on inline data.

use once_cell::sync::Lazy;
use regex::{Regex, escape};
use serde_json::{Map, Value};

use crate::paths::resource_data_path;

use super::schema::{Shown, index_path, key_path};
use super::{CheckError, Validator};

const GENERIC_DATA_PATH: &str = r"^resources/[^/]+/data\.parquet$";

static GENERIC_DATA_PATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(GENERIC_DATA_PATH).expect("valid data path regex"));

/// Package attributes every package must set.
pub const PACKAGE_REQUIRED_FIELDS: [&str; 8] = [
    "name",
    "id",
    "title",
    "description",
    "version",
    "created",
    "licenses",
    "contributors",
];

/// Resource attributes every resource must set.
pub const RESOURCE_REQUIRED_FIELDS: [&str; 5] = ["name", "path", "title", "description", "schema"];

/// Run all project rules over a whole package document.
pub(crate) fn check_project_rules(package: &Value) -> Vec<CheckError> {
    let mut errors = Vec::new();
    let Some(map) = package.as_object() else {
        return errors;
    };

    check_required_and_blank(map, &PACKAGE_REQUIRED_FIELDS, "$", &mut errors);

    if let Some(resources) = map.get("resources").and_then(Value::as_array) {
        for (i, resource) in resources.iter().enumerate() {
            if let Some(resource) = resource.as_object() {
                let path = index_path("$.resources", i);
                check_required_and_blank(resource, &RESOURCE_REQUIRED_FIELDS, &path, &mut errors);
                check_resource_path(resource, &path, &mut errors);
                check_no_inline_data(resource, &path, &mut errors);
            }
        }
    }

    errors
}

fn check_required_and_blank(
    map: &Map<String, Value>,
    required: &[&str],
    path: &str,
    errors: &mut Vec<CheckError>,
) {
    for key in required {
        match map.get(*key) {
            None | Some(Value::Null) => errors.push(CheckError::required(key, path)),
            Some(value) if is_blank(value) => errors.push(CheckError::new(
                format!("'{key}' is blank"),
                key_path(path, key),
                Validator::Blank,
            )),
            Some(_) => {}
        }
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn check_resource_path(resource: &Map<String, Value>, path: &str, errors: &mut Vec<CheckError>) {
    let Some(data_path) = resource.get("path") else {
        return;
    };
    let json_path = key_path(path, "path");

    let Some(data_path) = data_path.as_str() else {
        if !data_path.is_null() {
            errors.push(CheckError::new(
                format!("{} is not of type 'string'", Shown(data_path)),
                json_path,
                Validator::Type,
            ));
        }
        return;
    };
    if data_path.is_empty() {
        // Reported by the blank check.
        return;
    }

    let expected = match resource.get("name").and_then(Value::as_str) {
        Some(name) => {
            if data_path == resource_data_path(name) {
                return;
            }
            format!("^{}$", escape(&resource_data_path(name)))
        }
        None if GENERIC_DATA_PATH_RE.is_match(data_path) => return,
        None => GENERIC_DATA_PATH.to_string(),
    };

    errors.push(CheckError::new(
        format!("'{data_path}' does not match '{expected}'"),
        json_path,
        Validator::Pattern,
    ));
}

fn check_no_inline_data(resource: &Map<String, Value>, path: &str, errors: &mut Vec<CheckError>) {
    if resource.contains_key("data") {
        errors.push(CheckError::new(
            "'data' is not allowed; resource data lives in Parquet files",
            key_path(path, "data"),
            Validator::InlineData,
        ));
    }
}
