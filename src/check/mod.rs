//! Conformance checks for package and resource properties.
//!
//! Checking never stops at the first problem: every entry point returns the complete, sorted and
//! de-duplicated list of [`CheckError`]s. The `ensure_*` wrappers turn a non-empty list into a
//! [`CheckErrorGroup`] for callers that want a `Result`.
//!
//! Checks run against the JSON form of the properties (camelCase keys), so the same functions
//! work for typed properties (via `serde_json::to_value`) and for documents read from disk that
//! may not even deserialize.
//!
//! ```rust
//! use data_package_core::check::{check_resource_properties, CheckOptions, Validator};
//! use serde_json::json;
//!
//! let resource = json!({"name": "birds", "path": "resources/1/data"});
//! let errors = check_resource_properties(&resource, &CheckOptions::default());
//! assert!(errors.iter().any(|e| e.json_path == "$.path" && e.validator == Validator::Pattern));
//! ```

mod matcher;
mod rules;
mod schema;
mod standard;

use std::fmt;

use serde::Serialize;
use serde_json::{Value, json};

pub use matcher::{ErrorFilter, ErrorMatcher};
pub use rules::{PACKAGE_REQUIRED_FIELDS, RESOURCE_REQUIRED_FIELDS};
pub use standard::SEMVER_PATTERN;

/// The kind of check that failed.
///
/// Variants compare in declaration order, which is the order errors on the same path are listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Validator {
    /// A required key is absent.
    Required,
    /// A value has the wrong JSON type.
    Type,
    /// A string does not match its pattern (names, versions, paths).
    Pattern,
    /// A string is not in its declared format, such as `uri` or `email`.
    Format,
    /// A string is empty or whitespace only.
    Blank,
    /// A resource carries inline `data`.
    InlineData,
    /// A value is not one of the allowed values.
    Enum,
    /// An array has fewer items than required.
    MinItems,
}

impl Validator {
    /// The kebab-case tag shown in messages and serialized output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Validator::Required => "required",
            Validator::Type => "type",
            Validator::Pattern => "pattern",
            Validator::Format => "format",
            Validator::Blank => "blank",
            Validator::InlineData => "inline-data",
            Validator::Enum => "enum",
            Validator::MinItems => "min-items",
        }
    }
}

impl fmt::Display for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One failed check.
///
/// Errors order by path, then validator, then message. Validators compare in declaration order
/// (required, type, pattern, format, blank, inline-data, enum, min-items), not by their tags.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CheckError {
    /// Location in the properties document, e.g. `$.resources[0].name`.
    pub json_path: String,
    pub validator: Validator,
    pub message: String,
}

impl CheckError {
    /// An error with the given message, location and kind.
    pub fn new(message: impl Into<String>, json_path: impl Into<String>, validator: Validator) -> Self {
        Self {
            json_path: json_path.into(),
            validator,
            message: message.into(),
        }
    }

    /// A missing `key` under the object at `parent`. The path points at the missing key.
    pub(crate) fn required(key: &str, parent: &str) -> Self {
        Self::new(
            format!("'{key}' is a required property"),
            schema::key_path(parent, key),
            Validator::Required,
        )
    }
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.json_path, self.validator, self.message)
    }
}

/// A non-empty set of [`CheckError`]s, returned by the `ensure_*` functions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckErrorGroup {
    pub errors: Vec<CheckError>,
}

impl fmt::Display for CheckErrorGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "properties failed {} check(s):", self.errors.len())?;
        for e in &self.errors {
            write!(f, "\n  {e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CheckErrorGroup {}

/// Options controlling property checks.
#[derive(Debug, Clone)]
pub struct CheckOptions {
    /// Also apply the stricter recommended profile (name and version patterns, titles on
    /// contributors and sources, names on licenses).
    pub check_recommendations: bool,
    /// Errors matching any of these are dropped from the result.
    pub excludes: Vec<ErrorFilter>,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            check_recommendations: true,
            excludes: Vec::new(),
        }
    }
}

impl CheckOptions {
    /// Check only the standard profile.
    pub fn without_recommendations(mut self) -> Self {
        self.check_recommendations = false;
        self
    }

    /// Drop errors matching `filter`. May be called repeatedly; an error matching any filter
    /// is dropped.
    pub fn excluding(mut self, filter: impl Into<ErrorFilter>) -> Self {
        self.excludes.push(filter.into());
        self
    }
}

const RESOURCE_PREFIX: &str = "$.resources[";
const WRAPPED_RESOURCE: &str = "$.resources[0]";

/// Check a whole package document: the standard (and optionally recommended) schema plus the
/// project rules.
pub fn check_properties(properties: &Value, options: &CheckOptions) -> Vec<CheckError> {
    finish(collect(properties, options.check_recommendations), options)
}

/// Check only the package-level part of a document.
///
/// Errors under `resources[...]` are ignored, as is a missing `resources` field, so this works
/// for a package that has no resources yet.
pub fn check_package_properties(properties: &Value, options: &CheckOptions) -> Vec<CheckError> {
    let errors = collect(properties, options.check_recommendations)
        .into_iter()
        .filter(|e| {
            !e.json_path.starts_with(RESOURCE_PREFIX)
                && !(e.validator == Validator::Required && e.json_path == "$.resources")
        })
        .collect();
    finish(errors, options)
}

/// Check a single resource document.
///
/// The resource is wrapped in a synthetic package for checking; reported paths are relative to
/// the resource (`$.name`, not `$.resources[0].name`).
pub fn check_resource_properties(properties: &Value, options: &CheckOptions) -> Vec<CheckError> {
    let package = json!({ "resources": [properties] });
    let errors = collect(&package, options.check_recommendations)
        .into_iter()
        .filter_map(|mut e| {
            let rest = e.json_path.strip_prefix(WRAPPED_RESOURCE)?;
            if !(rest.is_empty() || rest.starts_with('.') || rest.starts_with('[')) {
                return None;
            }
            e.json_path = format!("${rest}");
            Some(e)
        })
        .collect();
    finish(errors, options)
}

/// Like [`check_properties`], but returns the errors as an `Err`.
pub fn ensure_properties(properties: &Value, options: &CheckOptions) -> Result<(), CheckErrorGroup> {
    into_result(check_properties(properties, options))
}

/// Like [`check_package_properties`], but returns the errors as an `Err`.
pub fn ensure_package_properties(
    properties: &Value,
    options: &CheckOptions,
) -> Result<(), CheckErrorGroup> {
    into_result(check_package_properties(properties, options))
}

/// Like [`check_resource_properties`], but returns the errors as an `Err`.
pub fn ensure_resource_properties(
    properties: &Value,
    options: &CheckOptions,
) -> Result<(), CheckErrorGroup> {
    into_result(check_resource_properties(properties, options))
}

fn collect(properties: &Value, check_recommendations: bool) -> Vec<CheckError> {
    let mut errors = Vec::new();
    standard::package_schema(check_recommendations).evaluate(properties, "$", &mut errors);
    errors.extend(rules::check_project_rules(properties));
    errors
}

fn finish(errors: Vec<CheckError>, options: &CheckOptions) -> Vec<CheckError> {
    let mut errors: Vec<CheckError> = errors
        .into_iter()
        .filter(|e| !options.excludes.iter().any(|f| f.matches(e)))
        .collect();
    errors.sort();
    errors.dedup();
    tracing::debug!(errors = errors.len(), "checked properties");
    errors
}

fn into_result(errors: Vec<CheckError>) -> Result<(), CheckErrorGroup> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(CheckErrorGroup { errors })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn errors_sort_by_path_then_validator_then_message() {
        let mut errors = vec![
            CheckError::new("b", "$.b", Validator::Type),
            CheckError::new("z", "$.a", Validator::Type),
            CheckError::new("a", "$.a", Validator::Type),
            CheckError::new("a", "$.a", Validator::Required),
        ];
        errors.sort();
        let keys: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        assert_eq!(
            keys,
            vec!["$.a [required] a", "$.a [type] a", "$.a [type] z", "$.b [type] b"]
        );
    }

    #[test]
    fn validators_order_by_declaration_not_tag() {
        let mut errors = vec![
            CheckError::new("m", "$.a", Validator::MinItems),
            CheckError::new("b", "$.a", Validator::Blank),
            CheckError::new("t", "$.a", Validator::Type),
        ];
        errors.sort();
        let order: Vec<Validator> = errors.iter().map(|e| e.validator).collect();
        assert_eq!(order, vec![Validator::Type, Validator::Blank, Validator::MinItems]);
    }

    #[test]
    fn resource_paths_are_rewritten_relative_to_the_resource() {
        let errors = check_resource_properties(&json!({"path": "resources/x/data.parquet"}), &CheckOptions::default());
        let required: Vec<&str> = errors
            .iter()
            .filter(|e| e.validator == Validator::Required)
            .map(|e| e.json_path.as_str())
            .collect();
        assert_eq!(required, vec!["$.description", "$.name", "$.schema", "$.title"]);
    }

    #[test]
    fn non_object_resource_reports_at_root() {
        let errors = check_resource_properties(&json!("nope"), &CheckOptions::default());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].json_path, "$");
        assert_eq!(errors[0].validator, Validator::Type);
    }

    #[test]
    fn excludes_drop_matching_errors() {
        let options = CheckOptions::default()
            .excluding(ErrorMatcher::new().validator(Validator::Required));
        let errors = check_resource_properties(&json!({"name": "birds"}), &options);
        assert!(errors.iter().all(|e| e.validator != Validator::Required));
    }

    #[test]
    fn group_display_lists_every_error() {
        let group = CheckErrorGroup {
            errors: vec![CheckError::required("name", "$"), CheckError::required("id", "$")],
        };
        let text = group.to_string();
        assert!(text.starts_with("properties failed 2 check(s):"));
        assert!(text.contains("$.name [required] 'name' is a required property"));
    }
}
