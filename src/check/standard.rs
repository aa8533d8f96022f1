//! The Data Package standard (table-shaped subset) as a typed rule tree, plus the stricter
//! "recommended" profile derived from it.

use once_cell::sync::Lazy;

use crate::properties::{FieldType, NAME_PATTERN};

use super::schema::{Pattern, Rule, StringFormat};

/// Semantic version 2.0.0.
pub const SEMVER_PATTERN: &str = r"^(0|[1-9]\d*)\.(0|[1-9]\d*)\.(0|[1-9]\d*)(?:-((?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*)(?:\.(?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*))*))?(?:\+([0-9a-zA-Z-]+(?:\.[0-9a-zA-Z-]+)*))?$";

static STANDARD: Lazy<Rule> = Lazy::new(package_rule);
static RECOMMENDED: Lazy<Rule> = Lazy::new(|| recommended(package_rule()));

/// The package rule to check against.
pub(crate) fn package_schema(check_recommendations: bool) -> &'static Rule {
    if check_recommendations {
        &*RECOMMENDED
    } else {
        &*STANDARD
    }
}

fn package_rule() -> Rule {
    Rule::object(
        vec![
            ("name", Rule::string()),
            ("id", Rule::string()),
            ("profile", Rule::string()),
            ("title", Rule::string()),
            ("description", Rule::string()),
            ("homepage", Rule::string()),
            ("version", Rule::string()),
            ("created", Rule::formatted(StringFormat::DateTime)),
            ("keywords", Rule::non_empty_array(Rule::string())),
            ("image", Rule::string()),
            ("contributors", Rule::array(contributor_rule())),
            ("licenses", Rule::non_empty_array(license_rule())),
            ("sources", Rule::array(source_rule())),
            ("resources", Rule::non_empty_array(resource_rule())),
        ],
        vec!["resources"],
    )
}

fn contributor_rule() -> Rule {
    Rule::object(
        vec![
            ("title", Rule::string()),
            ("path", Rule::string()),
            ("email", Rule::formatted(StringFormat::Email)),
            ("organization", Rule::string()),
            ("role", Rule::string()),
        ],
        vec![],
    )
}

fn license_rule() -> Rule {
    Rule::object(
        vec![
            ("name", Rule::string().with_pattern(Pattern::fixed(r"^([-a-zA-Z0-9._])+$"))),
            ("path", Rule::string()),
            ("title", Rule::string()),
        ],
        vec![],
    )
}

fn source_rule() -> Rule {
    Rule::object(
        vec![
            ("title", Rule::string()),
            ("path", Rule::string()),
            ("email", Rule::formatted(StringFormat::Email)),
        ],
        vec![],
    )
}

fn resource_rule() -> Rule {
    Rule::object(
        vec![
            ("name", Rule::string()),
            (
                "path",
                Rule::Union(vec![Rule::string(), Rule::non_empty_array(Rule::string())]),
            ),
            ("data", Rule::Any),
            ("profile", Rule::string()),
            ("title", Rule::string()),
            ("description", Rule::string()),
            ("format", Rule::string()),
            ("mediatype", Rule::string().with_pattern(Pattern::fixed(r"^(.+)/(.+)$"))),
            ("encoding", Rule::string()),
            ("bytes", Rule::Integer),
            ("hash", Rule::string()),
            ("schema", table_schema_rule()),
            ("sources", Rule::array(source_rule())),
            ("licenses", Rule::non_empty_array(license_rule())),
        ],
        vec!["name"],
    )
}

fn field_names_rule() -> Rule {
    Rule::Union(vec![Rule::string(), Rule::array(Rule::string())])
}

fn table_schema_rule() -> Rule {
    Rule::object(
        vec![
            ("fields", Rule::array(field_rule())),
            ("primaryKey", field_names_rule()),
            ("uniqueKeys", Rule::array(Rule::array(Rule::string()))),
            (
                "foreignKeys",
                Rule::array(Rule::object(
                    vec![
                        ("fields", field_names_rule()),
                        (
                            "reference",
                            Rule::object(
                                vec![("resource", Rule::string()), ("fields", field_names_rule())],
                                vec!["resource", "fields"],
                            ),
                        ),
                    ],
                    vec!["fields", "reference"],
                )),
            ),
            ("missingValues", Rule::array(Rule::string())),
        ],
        vec!["fields"],
    )
}

fn field_rule() -> Rule {
    Rule::object(
        vec![
            ("name", Rule::string()),
            ("title", Rule::string()),
            ("description", Rule::string()),
            ("type", Rule::Enum(FieldType::ALL.iter().map(|t| t.as_str()).collect())),
            ("format", Rule::string()),
            ("example", Rule::Any),
            (
                "constraints",
                Rule::object(
                    vec![
                        ("required", Rule::Boolean),
                        ("unique", Rule::Boolean),
                        ("enum", Rule::non_empty_array(Rule::Any)),
                        ("minLength", Rule::Integer),
                        ("maxLength", Rule::Integer),
                        ("minimum", Rule::Any),
                        ("maximum", Rule::Any),
                        ("pattern", Rule::string()),
                    ],
                    vec![],
                ),
            ),
            ("missingValues", Rule::array(Rule::string())),
        ],
        vec!["name"],
    )
}

/// Derive the recommended profile from the standard package rule.
fn recommended(package: Rule) -> Rule {
    let package = version_pattern(name_pattern(package));
    [("contributors", "title"), ("sources", "title"), ("licenses", "name")]
        .into_iter()
        .fold(package, |rule, (array, field)| require_item_field(rule, array, field))
}

fn name_pattern(package: Rule) -> Rule {
    package
        .map_property("name", |r| r.with_pattern(Pattern::fixed(NAME_PATTERN)))
        .map_property("resources", |r| {
            r.map_items(|resource| {
                resource.map_property("name", |n| n.with_pattern(Pattern::fixed(NAME_PATTERN)))
            })
        })
}

fn version_pattern(package: Rule) -> Rule {
    package.map_property("version", |r| r.with_pattern(Pattern::fixed(SEMVER_PATTERN)))
}

/// Require `field` on every item of the package-level array `array`.
fn require_item_field(package: Rule, array: &str, field: &'static str) -> Rule {
    package.map_property(array, |r| r.map_items(|item| item.require(field)))
}
