use data_package_core::PackageError;
use data_package_core::properties::{
    ConstraintsProperties, FieldProperties, FieldType, ResourceProperties, TableSchemaProperties,
};
use data_package_core::types::Table;
use data_package_core::validation::{DataErrorGroup, check_data};

fn resource(fields: Vec<FieldProperties>) -> ResourceProperties {
    ResourceProperties::new("observations").with_schema(TableSchemaProperties::new(fields))
}

fn expect_data_errors(table: &Table, resource: &ResourceProperties) -> DataErrorGroup {
    match check_data(table, resource) {
        Err(PackageError::Data(group)) => group,
        other => panic!("expected data errors, got {other:?}"),
    }
}

#[test]
fn invalid_month_is_reported_with_row_and_value() {
    let r = resource(vec![FieldProperties::new("day", FieldType::Date)]);
    let table = Table::from_rows(&["day"], &[vec![Some("2002-13-10")]]);

    let group = expect_data_errors(&table, &r);
    assert_eq!(group.errors.len(), 1);
    let error = &group.errors[0];
    assert_eq!(error.name, "day");
    assert_eq!(error.field_type, Some(FieldType::Date));
    assert_eq!(error.failures.len(), 1);
    assert_eq!(error.failures[0].row, 0);
    assert_eq!(error.failures[0].value.as_deref(), Some("2002-13-10"));
}

#[test]
fn every_type_accepts_its_canonical_form() {
    let fields = [
        ("s", FieldType::String, "anything"),
        ("n", FieldType::Number, "-1.5e3"),
        ("i", FieldType::Integer, "+0042"),
        ("b", FieldType::Boolean, "FALSE"),
        ("o", FieldType::Object, r#"{"k": [1, 2]}"#),
        ("a", FieldType::Array, r#"[{"k": 1}]"#),
        ("dt", FieldType::Datetime, "2024-05-01T10:00:00Z"),
        ("d", FieldType::Date, "2024-05-01"),
        ("t", FieldType::Time, "10:00:00"),
        ("y", FieldType::Year, "1999"),
        ("ym", FieldType::Yearmonth, "1999-12"),
        ("du", FieldType::Duration, "P1DT12H"),
        ("g", FieldType::Geopoint, "-33.9, 151.2"),
        ("gj", FieldType::Geojson, r#"{"type": "Point", "coordinates": [151.2, -33.9]}"#),
        ("any", FieldType::Any, "¯\\_(ツ)_/¯"),
    ];
    let r = resource(fields.iter().map(|(n, t, _)| FieldProperties::new(*n, *t)).collect());
    let names: Vec<&str> = fields.iter().map(|(n, _, _)| *n).collect();
    let row: Vec<Option<&str>> = fields.iter().map(|(_, _, v)| Some(*v)).collect();
    let table = Table::from_rows(&names, &[row]);

    assert_eq!(check_data(&table, &r).unwrap(), table);
}

#[test]
fn every_bad_field_gets_one_aggregated_error() {
    let r = resource(vec![
        FieldProperties::new("id", FieldType::Integer),
        FieldProperties::new("when", FieldType::Time),
        FieldProperties::new("where", FieldType::Geopoint),
        FieldProperties::new("note", FieldType::String),
    ]);
    let table = Table::from_rows(
        &["id", "when", "where", "note"],
        &[
            vec![Some("1"), Some("25:00:00"), Some("0, 0"), Some("x")],
            vec![Some("two"), Some("10:00:00"), Some("100, 0"), Some("y")],
            vec![Some("3"), Some("10:00"), Some("0, 0"), Some("z")],
        ],
    );

    let group = expect_data_errors(&table, &r);
    let summary: Vec<(&str, Vec<usize>)> = group
        .errors
        .iter()
        .map(|e| (e.name.as_str(), e.rows()))
        .collect();
    assert_eq!(
        summary,
        vec![("id", vec![1]), ("when", vec![0, 2]), ("where", vec![1])]
    );
}

#[test]
fn datetime_columns_must_agree_on_timezones() {
    let r = resource(vec![FieldProperties::new("at", FieldType::Datetime)]);
    let table = Table::from_rows(
        &["at"],
        &[
            vec![None],
            vec![Some("2024-01-01T00:00:00")],
            vec![Some("2024-01-01T00:00:00+01:00")],
            vec![Some("2024-01-02T00:00:00")],
        ],
    );
    let group = expect_data_errors(&table, &r);
    assert_eq!(group.errors[0].rows(), vec![2]);
}

#[test]
fn string_formats_are_checked() {
    let r = resource(vec![
        FieldProperties::new("email", FieldType::String).with_format("email"),
        FieldProperties::new("key", FieldType::String).with_format("uuid"),
        FieldProperties::new("blob", FieldType::String).with_format("binary"),
    ]);
    let table = Table::from_rows(
        &["email", "key", "blob"],
        &[
            vec![Some("a@b.io"), Some("0b6c7f5e-3b1a-4d2e-9f8a-1c2d3e4f5a6b"), Some("AAEC")],
            vec![Some("nope"), Some("123"), Some("***")],
        ],
    );
    let group = expect_data_errors(&table, &r);
    assert_eq!(group.errors.len(), 3);
    assert!(group.errors.iter().all(|e| e.rows() == vec![1]));
}

#[test]
fn column_mismatch_is_reported_before_cells() {
    let r = resource(vec![
        FieldProperties::new("id", FieldType::Integer),
        FieldProperties::new("name", FieldType::String),
    ]);
    let table = Table::from_rows(&["id", "nmae"], &[vec![Some("not a number"), Some("x")]]);

    match check_data(&table, &r) {
        Err(PackageError::ColumnMismatch { extra, missing }) => {
            assert_eq!(extra, vec!["nmae"]);
            assert_eq!(missing, vec!["name"]);
        }
        other => panic!("expected a column mismatch, got {other:?}"),
    }
}

#[test]
fn missing_values_become_null_before_type_checks() {
    let mut schema = TableSchemaProperties::new(vec![
        FieldProperties::new("count", FieldType::Integer),
        FieldProperties::new("code", FieldType::String).with_missing_values(Vec::new()),
    ]);
    schema.missing_values = Some(vec!["".into(), "NA".into()]);
    let r = ResourceProperties::new("observations").with_schema(schema);

    let table = Table::from_rows(&["count", "code"], &[vec![Some("NA"), Some("NA")], vec![Some(""), Some("")]]);
    let out = check_data(&table, &r).unwrap();
    assert_eq!(
        out.rows,
        vec![
            vec![None, Some("NA".to_string())],
            vec![None, Some(String::new())],
        ]
    );
}

#[test]
fn required_fields_reject_missing_values() {
    let r = resource(vec![FieldProperties::new("id", FieldType::Integer).with_constraints(
        ConstraintsProperties {
            required: Some(true),
            unique: Some(true),
            ..Default::default()
        },
    )]);
    let table = Table::from_rows(&["id"], &[vec![Some("1")], vec![Some("")], vec![Some("1")]]);

    let group = expect_data_errors(&table, &r);
    let reasons: Vec<(usize, &str)> = group.errors[0]
        .failures
        .iter()
        .map(|f| (f.row, f.reason.as_str()))
        .collect();
    assert_eq!(reasons, vec![(1, "value is required"), (2, "duplicate value")]);
}

#[test]
fn validated_table_is_idempotent() {
    let r = resource(vec![FieldProperties::new("n", FieldType::Number)]);
    let table = Table::from_rows(&["n"], &[vec![Some("1")], vec![Some("")], vec![Some("NaN")]]);
    let once = check_data(&table, &r).unwrap();
    let twice = check_data(&once, &r).unwrap();
    assert_eq!(once, twice);
}
