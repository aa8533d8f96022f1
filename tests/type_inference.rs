use std::io::Write;

use data_package_core::inference::{
    ColumnTypeStats, InferenceOptions, InferredType, infer_csv_properties,
    infer_csv_properties_from_path, infer_table_types,
};
use data_package_core::properties::FieldType;
use data_package_core::types::Table;

#[test]
fn string_is_terminal() {
    let mut stats = ColumnTypeStats::new("mixed");
    for value in ["1", "2", "2.2", "2.2 Text"] {
        stats.analyze(Some(value));
    }
    assert_eq!(stats.inferred_type().as_str(), "str");

    stats.analyze(Some("2"));
    assert_eq!(stats.inferred_type().as_str(), "str");
}

#[test]
fn type_index_never_decreases() {
    let sequences: [&[&str]; 4] = [
        &["1", "0", "7", "3.5", "1", "yes"],
        &["12:30", "2024-01-01", "09:00", "2024-01-01T10:00:00", "2024-01-02"],
        &["y", "n", "2", "true", "x", "1"],
        &["2024-01-01", "", "2024-01-01 00:00:00", "1999-12-31"],
    ];

    for values in sequences {
        let mut stats = ColumnTypeStats::new("c");
        let mut last = stats.inferred_type().index();
        let mut reached_str = false;
        for v in values {
            stats.analyze(Some(v));
            let now = stats.inferred_type().index();
            assert!(now >= last, "{values:?}: narrowed at {v}");
            if reached_str {
                assert_eq!(stats.inferred_type(), InferredType::Str);
            }
            reached_str |= stats.inferred_type() == InferredType::Str;
            last = now;
        }
    }
}

#[test]
fn midnight_only_dates_stay_dates() {
    let mut stats = ColumnTypeStats::new("day");
    stats.analyze(Some("2024-01-01"));
    stats.analyze(Some("2024-01-02 00:00:00"));
    assert_eq!(stats.inferred_type(), InferredType::Date);

    stats.analyze(Some("2024-01-03 08:30:00"));
    assert_eq!(stats.inferred_type(), InferredType::Datetime);
}

#[test]
fn short_strings_are_not_times_or_dates() {
    let mut stats = ColumnTypeStats::new("c");
    stats.analyze(Some("1:30"));
    assert_eq!(stats.inferred_type(), InferredType::Str);
}

#[test]
fn table_inference_covers_every_column() {
    let table = Table::from_rows(
        &["flag", "count", "ratio", "note"],
        &[
            vec![Some("yes"), Some("1"), Some("0.5"), None],
            vec![Some("no"), Some("2"), Some("1"), Some("ok")],
        ],
    );
    let types: Vec<InferredType> = infer_table_types(&table)
        .iter()
        .map(ColumnTypeStats::inferred_type)
        .collect();
    assert_eq!(
        types,
        vec![
            InferredType::Bool,
            InferredType::Int,
            InferredType::Float,
            InferredType::Str
        ]
    );
}

#[test]
fn csv_properties_detect_delimiter_and_types() {
    let csv = "id;seen;when;comment\n1;true;2024-05-01;first\n2;false;2024-05-02;\n3;true;2024-05-03;third\n";
    let resource = infer_csv_properties(csv.as_bytes(), &InferenceOptions::default()).unwrap();

    assert_eq!(resource.format.as_deref(), Some("csv"));
    assert_eq!(resource.mediatype.as_deref(), Some("text/csv"));
    assert_eq!(resource.encoding.as_deref(), Some("utf-8"));

    let fields: Vec<(Option<&str>, Option<FieldType>, bool)> = resource
        .fields()
        .iter()
        .map(|f| (f.name.as_deref(), f.field_type, f.is_required()))
        .collect();
    assert_eq!(
        fields,
        vec![
            (Some("id"), Some(FieldType::Integer), true),
            (Some("seen"), Some(FieldType::Boolean), true),
            (Some("when"), Some(FieldType::Date), true),
            (Some("comment"), Some(FieldType::String), false),
        ]
    );
}

#[test]
fn max_rows_limits_the_scan() {
    let csv = "n\n1\n2\nthree\n";
    let options = InferenceOptions {
        max_rows: 2,
        ..Default::default()
    };
    let resource = infer_csv_properties(csv.as_bytes(), &options).unwrap();
    assert_eq!(resource.fields()[0].field_type, Some(FieldType::Integer));

    let resource = infer_csv_properties(csv.as_bytes(), &InferenceOptions::default()).unwrap();
    assert_eq!(resource.fields()[0].field_type, Some(FieldType::String));
}

#[test]
fn forced_delimiter_wins_over_detection() {
    let csv = "a,b|c\n1,2|3\n";
    let options = InferenceOptions {
        delimiter: Some(b'|'),
        ..Default::default()
    };
    let resource = infer_csv_properties(csv.as_bytes(), &options).unwrap();
    let names: Vec<Option<&str>> = resource.fields().iter().map(|f| f.name.as_deref()).collect();
    assert_eq!(names, vec![Some("a,b"), Some("c")]);
}

#[test]
fn file_stem_names_the_resource() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Bird Counts.csv");
    let mut f = std::fs::File::create(&path).unwrap();
    writeln!(f, "site\tcount").unwrap();
    writeln!(f, "north\t12").unwrap();
    drop(f);

    let resource = infer_csv_properties_from_path(&path, &InferenceOptions::default()).unwrap();
    assert_eq!(resource.name(), Some("bird-counts"));
    assert_eq!(resource.path(), Some("resources/bird-counts/data.parquet"));
    assert_eq!(resource.fields().len(), 2);
}
