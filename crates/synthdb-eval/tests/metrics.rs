use std::fs;

use serde_json::{Value, json};
use synthdb_eval::{
    EvalError, collect_generation_metrics, evaluate_run_dir, render_comparison, render_report,
};
use synthdb_generate::{GeneratedData, MethodComparison, MethodOutcome, Record};
use synthdb_plan::parse_schema;

const SHOP_SQL: &str = "CREATE TABLE orders (id INTEGER PRIMARY KEY, customer_id INTEGER, \
FOREIGN KEY (customer_id) REFERENCES customers(id)); \
CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT); \
CREATE TABLE reviews (id INTEGER PRIMARY KEY, order_id INTEGER REFERENCES orders(id));";

fn table(value: Value) -> Vec<Record> {
    serde_json::from_value(value).expect("array of objects")
}

fn shop_data() -> GeneratedData {
    let mut data = GeneratedData::new();
    data.insert(
        "customers".to_string(),
        table(json!([{"id": 1, "name": "Ann"}, {"id": 2, "name": "Bo"}, {"id": 3, "name": "Cy"}, {"id": 4}])),
    );
    data.insert(
        "orders".to_string(),
        table(json!([
            {"id": 1, "customer_id": 1},
            {"id": 2, "customer_id": 3},
            {"id": 3, "customer_id": "2"},
            {"id": 4, "customer_id": null}
        ])),
    );
    data.insert("ghosts".to_string(), table(json!([{"id": 1}])));
    data
}

#[test]
fn metrics_follow_generation_order() {
    let schema = parse_schema(SHOP_SQL);
    let metrics = collect_generation_metrics(&schema, SHOP_SQL, &shop_data(), 5, 0.8);

    let order: Vec<&str> = metrics.tables.iter().map(|t| t.table.as_str()).collect();
    assert_eq!(order, vec!["customers", "orders", "reviews"]);
    assert_eq!(metrics.total_tables, 3);
    assert_eq!(metrics.populated_tables, 2);
    assert!((metrics.population_ratio - 2.0 / 3.0).abs() < 1e-9);
    assert_eq!(metrics.total_records, 8);

    // 4 of 5 rows sits exactly on the 80% line
    assert!(metrics.tables[0].meets_threshold);
    assert!(!metrics.tables[2].meets_threshold);
}

#[test]
fn referential_checks_compare_json_text_and_skip_nulls() {
    let schema = parse_schema(SHOP_SQL);
    let metrics = collect_generation_metrics(&schema, SHOP_SQL, &shop_data(), 5, 0.8);

    assert_eq!(metrics.referential.len(), 2);
    let check = &metrics.referential[0];
    assert_eq!(
        (check.table.as_str(), check.column.as_str(), check.target_table.as_str()),
        ("orders", "customer_id", "customers")
    );
    assert_eq!(check.checked, 3);
    assert_eq!(check.matched, 2);
    assert!((check.ratio - 2.0 / 3.0).abs() < 1e-9);

    // reviews has no rows, so nothing is checked against orders
    let reviews = &metrics.referential[1];
    assert_eq!((reviews.checked, reviews.matched, reviews.ratio), (0, 0, 1.0));

    let codes: Vec<&str> = metrics.warnings.iter().map(|w| w.code.as_str()).collect();
    assert!(codes.contains(&"orphan_reference"));
    assert!(codes.contains(&"unknown_table"));
    assert!(codes.contains(&"below_threshold"));
}

#[test]
fn references_to_empty_parents_are_not_checked() {
    let sql = "CREATE TABLE customers (id INTEGER PRIMARY KEY); \
               CREATE TABLE orders (id INTEGER PRIMARY KEY, customer_id INTEGER REFERENCES customers(id));";
    let mut data = GeneratedData::new();
    data.insert("orders".to_string(), table(json!([{"id": 1, "customer_id": 7}])));

    let metrics = collect_generation_metrics(&parse_schema(sql), sql, &data, 1, 0.8);
    assert!(metrics.referential.is_empty());
    assert_eq!(metrics.warnings[0].code, "below_threshold");
    assert!(metrics
        .warnings
        .iter()
        .any(|w| w.code == "missing_parent_data" && w.path == "orders.customer_id"));
}

#[test]
fn empty_schema_scores_zero() {
    let schema = parse_schema("");
    let metrics = collect_generation_metrics(&schema, "", &GeneratedData::new(), 50, 0.8);
    assert_eq!(metrics.population_ratio, 0.0);
    assert!(metrics.tables.is_empty());
    assert!(metrics.referential.is_empty());
}

#[test]
fn report_lists_tables_and_references() {
    let schema = parse_schema(SHOP_SQL);
    let metrics = collect_generation_metrics(&schema, SHOP_SQL, &shop_data(), 5, 0.8);
    let report = render_report(&metrics);

    assert!(report.starts_with("# Synthdb Generation Report"));
    assert!(report.contains("| 0 | customers | 4 | 5 | ok |"));
    assert!(report.contains("| orders.customer_id -> customers.id | 3 | 2 | 0.67 |"));
    assert!(report.contains("- populated tables: 2/3 (67%)"));
}

#[test]
fn comparison_renders_both_methods() {
    let legacy = MethodOutcome {
        success: true,
        populated_tables: 1,
        total_tables: 2,
        success_rate: 0.5,
        error: None,
    };
    let robust = MethodOutcome {
        success: true,
        populated_tables: 2,
        total_tables: 2,
        success_rate: 1.0,
        error: None,
    };
    let rendered = render_comparison(&MethodComparison::new(legacy, robust));

    assert!(rendered.contains("| legacy | true | 1 | 2 | 0.50 | - |"));
    assert!(rendered.contains("| robust | true | 2 | 2 | 1.00 | - |"));
    assert!(rendered.contains("- improvement: +0.50 (+100.0%)"));
    assert!(rendered.ends_with("- better method: robust"));
}

#[test]
fn evaluates_a_run_directory() {
    let dir = std::env::temp_dir().join(format!("2026-01-01T00-00-00Z__run_{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&dir).expect("create run dir");
    fs::write(dir.join("schema.sql"), SHOP_SQL).expect("write schema");
    fs::write(
        dir.join("data.json"),
        serde_json::to_vec_pretty(&shop_data()).expect("encode"),
    )
    .expect("write data");

    let metrics = evaluate_run_dir(&dir, 5, 0.8).expect("evaluate");
    let run_id = metrics.run_id.as_deref().expect("run id");
    assert!(dir.to_string_lossy().ends_with(run_id));
    assert_eq!(metrics.populated_tables, 2);

    fs::write(dir.join("data.json"), "[1, 2]").expect("overwrite data");
    assert!(matches!(
        evaluate_run_dir(&dir, 5, 0.8),
        Err(EvalError::InvalidDataset(_))
    ));

    fs::remove_dir_all(dir).ok();
}
