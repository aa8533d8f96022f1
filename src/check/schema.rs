//! A small typed rule tree for the structural part of property checking.
//!
//! Rules are plain values: they are built once, never mutated, and variants of a rule (such as
//! the recommended profile) are produced by functions that take a rule and return a new one.

use std::fmt;

use chrono::DateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::{CheckError, Validator};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$")
        .expect("valid email regex")
});

/// A compiled regex that remembers its source, for error messages.
#[derive(Debug, Clone)]
pub(crate) struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Compile a pattern known at build time.
    pub(crate) fn fixed(source: &str) -> Self {
        Self {
            source: source.to_string(),
            regex: Regex::new(source).expect("built-in patterns are valid"),
        }
    }
}

/// String formats the standard schema asserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StringFormat {
    Email,
    DateTime,
}

impl StringFormat {
    fn name(self) -> &'static str {
        match self {
            StringFormat::Email => "email",
            StringFormat::DateTime => "date-time",
        }
    }

    fn accepts(self, s: &str) -> bool {
        match self {
            StringFormat::Email => s.len() <= 254 && EMAIL_RE.is_match(s),
            StringFormat::DateTime => DateTime::parse_from_rfc3339(s).is_ok(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Rule {
    Any,
    String {
        pattern: Option<Pattern>,
        format: Option<StringFormat>,
    },
    Integer,
    Number,
    Boolean,
    /// A string from a closed set.
    Enum(Vec<&'static str>),
    Array {
        items: Box<Rule>,
        min_items: Option<usize>,
    },
    Object {
        properties: Vec<(&'static str, Rule)>,
        required: Vec<&'static str>,
    },
    /// One of several JSON types; the alternative whose type matches is evaluated.
    Union(Vec<Rule>),
}

impl Rule {
    pub(crate) fn string() -> Self {
        Rule::String {
            pattern: None,
            format: None,
        }
    }

    pub(crate) fn formatted(format: StringFormat) -> Self {
        Rule::String {
            pattern: None,
            format: Some(format),
        }
    }

    pub(crate) fn array(items: Rule) -> Self {
        Rule::Array {
            items: Box::new(items),
            min_items: None,
        }
    }

    pub(crate) fn non_empty_array(items: Rule) -> Self {
        Rule::Array {
            items: Box::new(items),
            min_items: Some(1),
        }
    }

    pub(crate) fn object(properties: Vec<(&'static str, Rule)>, required: Vec<&'static str>) -> Self {
        Rule::Object {
            properties,
            required,
        }
    }

    /// Set the pattern of a string rule. Other rules are returned unchanged.
    pub(crate) fn with_pattern(self, pattern: Pattern) -> Self {
        match self {
            Rule::String { format, .. } => Rule::String {
                pattern: Some(pattern),
                format,
            },
            other => other,
        }
    }

    /// Add `key` to the required list of an object rule.
    pub(crate) fn require(self, key: &'static str) -> Self {
        match self {
            Rule::Object {
                properties,
                mut required,
            } => {
                if !required.contains(&key) {
                    required.push(key);
                }
                Rule::Object {
                    properties,
                    required,
                }
            }
            other => other,
        }
    }

    /// Replace the rule of property `key` with `f(rule)`.
    pub(crate) fn map_property(self, key: &str, f: impl FnOnce(Rule) -> Rule) -> Self {
        match self {
            Rule::Object {
                properties,
                required,
            } => {
                let mut f = Some(f);
                let properties = properties
                    .into_iter()
                    .map(|(k, rule)| match (k == key, f.take()) {
                        (true, Some(f)) => (k, f(rule)),
                        (_, unused) => {
                            f = unused;
                            (k, rule)
                        }
                    })
                    .collect();
                Rule::Object {
                    properties,
                    required,
                }
            }
            other => other,
        }
    }

    /// Replace the item rule of an array rule with `f(items)`.
    pub(crate) fn map_items(self, f: impl FnOnce(Rule) -> Rule) -> Self {
        match self {
            Rule::Array { items, min_items } => Rule::Array {
                items: Box::new(f(*items)),
                min_items,
            },
            other => other,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Rule::Any => "any",
            Rule::String { .. } | Rule::Enum(_) => "string",
            Rule::Integer => "integer",
            Rule::Number => "number",
            Rule::Boolean => "boolean",
            Rule::Array { .. } => "array",
            Rule::Object { .. } => "object",
            Rule::Union(_) => "union",
        }
    }

    fn type_matches(&self, value: &Value) -> bool {
        match self {
            Rule::Any => true,
            Rule::String { .. } | Rule::Enum(_) => value.is_string(),
            Rule::Integer => is_integer(value),
            Rule::Number => value.is_number(),
            Rule::Boolean => value.is_boolean(),
            Rule::Array { .. } => value.is_array(),
            Rule::Object { .. } => value.is_object(),
            Rule::Union(alternatives) => alternatives.iter().any(|r| r.type_matches(value)),
        }
    }

    /// Evaluate `value` (located at `path`) and append every violation to `errors`.
    pub(crate) fn evaluate(&self, value: &Value, path: &str, errors: &mut Vec<CheckError>) {
        if !self.type_matches(value) {
            let expected = match self {
                Rule::Union(alternatives) => alternatives
                    .iter()
                    .map(|r| format!("'{}'", r.type_name()))
                    .collect::<Vec<_>>()
                    .join(", "),
                other => format!("'{}'", other.type_name()),
            };
            errors.push(CheckError::new(
                format!("{} is not of type {expected}", Shown(value)),
                path,
                Validator::Type,
            ));
            return;
        }

        match self {
            Rule::Any | Rule::Integer | Rule::Number | Rule::Boolean => {}
            Rule::String { pattern, format } => {
                let Some(s) = value.as_str() else { return };
                if let Some(p) = pattern {
                    if !p.regex.is_match(s) {
                        errors.push(CheckError::new(
                            format!("'{s}' does not match '{}'", p.source),
                            path,
                            Validator::Pattern,
                        ));
                    }
                }
                if let Some(f) = format {
                    if !f.accepts(s) {
                        errors.push(CheckError::new(
                            format!("'{s}' is not a '{}'", f.name()),
                            path,
                            Validator::Format,
                        ));
                    }
                }
            }
            Rule::Enum(allowed) => {
                let Some(s) = value.as_str() else { return };
                if !allowed.iter().any(|a| *a == s) {
                    let listed = allowed
                        .iter()
                        .map(|a| format!("'{a}'"))
                        .collect::<Vec<_>>()
                        .join(", ");
                    errors.push(CheckError::new(
                        format!("'{s}' is not one of [{listed}]"),
                        path,
                        Validator::Enum,
                    ));
                }
            }
            Rule::Array { items, min_items } => {
                let Some(values) = value.as_array() else { return };
                if let Some(min) = min_items {
                    if values.len() < *min {
                        errors.push(CheckError::new(
                            format!("{} should be non-empty", Shown(value)),
                            path,
                            Validator::MinItems,
                        ));
                    }
                }
                for (i, item) in values.iter().enumerate() {
                    items.evaluate(item, &index_path(path, i), errors);
                }
            }
            Rule::Object {
                properties,
                required,
            } => {
                let Some(map) = value.as_object() else { return };
                for key in required {
                    if !map.contains_key(*key) {
                        errors.push(CheckError::required(key, path));
                    }
                }
                for (key, rule) in properties {
                    if let Some(v) = map.get(*key) {
                        rule.evaluate(v, &key_path(path, key), errors);
                    }
                }
            }
            Rule::Union(alternatives) => {
                if let Some(rule) = alternatives.iter().find(|r| r.type_matches(value)) {
                    rule.evaluate(value, path, errors);
                }
            }
        }
    }
}

fn is_integer(value: &Value) -> bool {
    value.is_i64()
        || value.is_u64()
        || value.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
}

pub(crate) fn key_path(parent: &str, key: &str) -> String {
    format!("{parent}.{key}")
}

pub(crate) fn index_path(parent: &str, index: usize) -> String {
    format!("{parent}[{index}]")
}

/// Renders a JSON value the way it appears in messages: strings quoted with `'`.
pub(crate) struct Shown<'a>(pub(crate) &'a Value);

impl fmt::Display for Shown<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Value::String(s) => write!(f, "'{s}'"),
            other => write!(f, "{other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn run(rule: &Rule, value: Value) -> Vec<CheckError> {
        let mut errors = Vec::new();
        rule.evaluate(&value, "$", &mut errors);
        errors
    }

    #[test]
    fn collects_every_violation() {
        let rule = Rule::object(
            vec![
                ("name", Rule::string().with_pattern(Pattern::fixed("^[a-z]+$"))),
                ("count", Rule::Integer),
                ("email", Rule::formatted(StringFormat::Email)),
            ],
            vec!["title"],
        );

        let errors = run(&rule, json!({"name": "Bad", "count": "x", "email": "nope"}));
        let validators: Vec<Validator> = errors.iter().map(|e| e.validator).collect();
        assert_eq!(
            validators,
            vec![
                Validator::Required,
                Validator::Pattern,
                Validator::Type,
                Validator::Format
            ]
        );
        assert_eq!(errors[0].json_path, "$.title");
        assert_eq!(errors[2].message, "'x' is not of type 'integer'");
    }

    #[test]
    fn union_reports_all_expected_types() {
        let rule = Rule::Union(vec![Rule::string(), Rule::array(Rule::string())]);
        assert!(run(&rule, json!("a")).is_empty());
        assert!(run(&rule, json!(["a"])).is_empty());

        let errors = run(&rule, json!(1));
        assert_eq!(errors[0].message, "1 is not of type 'string', 'array'");
    }

    #[test]
    fn transforms_compose_without_touching_the_original() {
        let base = Rule::object(vec![("items", Rule::array(Rule::object(vec![], vec![])))], vec![]);
        let strict = base
            .clone()
            .map_property("items", |r| r.map_items(|item| item.require("title")));

        let value = json!({"items": [{}]});
        assert!(run(&base, value.clone()).is_empty());

        let errors = run(&strict, value);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].json_path, "$.items[0].title");
    }
}
