//! Inference and validation throughput on generated tables.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use data_package_core::inference::{InferenceOptions, infer_csv_properties, infer_table_types};
use data_package_core::properties::{FieldProperties, FieldType, ResourceProperties, TableSchemaProperties};
use data_package_core::types::Table;
use data_package_core::validation::check_data;

fn generated_table(rows: usize) -> Table {
    let columns = vec![
        "id".to_string(),
        "flag".to_string(),
        "ratio".to_string(),
        "day".to_string(),
        "note".to_string(),
    ];
    let rows = (0..rows)
        .map(|i| {
            vec![
                Some(i.to_string()),
                Some(if i % 2 == 0 { "true" } else { "false" }.to_string()),
                Some(format!("{}.{}", i / 7, i % 7)),
                Some(format!("2024-{:02}-{:02}", i % 12 + 1, i % 28 + 1)),
                (i % 5 != 0).then(|| format!("row {i}")),
            ]
        })
        .collect();
    Table::new(columns, rows)
}

fn generated_resource() -> ResourceProperties {
    ResourceProperties::new("generated").with_schema(TableSchemaProperties::new(vec![
        FieldProperties::new("id", FieldType::Integer),
        FieldProperties::new("flag", FieldType::Boolean),
        FieldProperties::new("ratio", FieldType::Number),
        FieldProperties::new("day", FieldType::Date),
        FieldProperties::new("note", FieldType::String),
    ]))
}

fn to_csv(table: &Table) -> String {
    let mut out = table.columns.join(",");
    out.push('\n');
    for row in &table.rows {
        let line: Vec<&str> = row.iter().map(|c| c.as_deref().unwrap_or("")).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    out
}

fn bench_inference(c: &mut Criterion) {
    let mut group = c.benchmark_group("inference");

    for rows in [1_000usize, 10_000] {
        let table = generated_table(rows);
        group.bench_with_input(BenchmarkId::new("table", rows), &table, |b, t| {
            b.iter(|| black_box(infer_table_types(t)));
        });

        let csv = to_csv(&table);
        let options = InferenceOptions::default();
        group.bench_with_input(BenchmarkId::new("csv", rows), &csv, |b, text| {
            b.iter(|| black_box(infer_csv_properties(text.as_bytes(), &options).unwrap()));
        });
    }

    group.finish();
}

fn bench_check_data(c: &mut Criterion) {
    let mut group = c.benchmark_group("check_data");
    let resource = generated_resource();

    for rows in [1_000usize, 10_000] {
        let table = generated_table(rows);
        group.bench_with_input(BenchmarkId::from_parameter(rows), &table, |b, t| {
            b.iter(|| black_box(check_data(t, &resource).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_inference, bench_check_data);
criterion_main!(benches);
