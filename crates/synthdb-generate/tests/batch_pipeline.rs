mod common;

use std::collections::BTreeSet;

use serde_json::{Value, json};
use synthdb_generate::{
    BatchGenerator, GenerationError, GeneratorSettings, NoProgress, RecoveryStrategy,
};
use synthdb_plan::parse_schema;

use common::{ProgressLog, Reply, SHOP_SQL, ScriptedModel, id_rows, rows};

fn generator(model: &std::sync::Arc<ScriptedModel>) -> BatchGenerator {
    BatchGenerator::new(model.clone(), GeneratorSettings::default())
}

#[tokio::test]
async fn parents_are_generated_before_children_with_reference_ids() {
    let model = ScriptedModel::new();
    model.table_reply("customers", Reply::json(id_rows(3)));
    model.table_reply(
        "orders",
        Reply::json(rows(3, |i| json!({"id": i, "customer_id": (i % 3) + 1, "total": "19.90"}))),
    );

    let schema = parse_schema(SHOP_SQL);
    let outcome = generator(&model)
        .generate_all_tables(&schema, SHOP_SQL, "Shop (retail business)", 3, &NoProgress)
        .await
        .expect("generation succeeds");

    assert_eq!(model.table_call_order(), vec!["customers", "orders"]);
    assert_eq!(outcome.report.generation_order, vec!["customers", "orders"]);

    let orders_prompt = &model.table_prompts("orders")[0];
    assert!(orders_prompt.contains("Reference Data:\nAvailable customers IDs: [1, 2, 3]"));
    assert!(!model.table_prompts("customers")[0].contains("Reference Data:\n"));

    let customer_ids: BTreeSet<String> = outcome.data["customers"]
        .iter()
        .map(|record| record["id"].to_string())
        .collect();
    for order in &outcome.data["orders"] {
        assert!(customer_ids.contains(&order["customer_id"].to_string()));
        assert_eq!(order["total"], json!(19.9));
    }
    assert_eq!(outcome.report.completed_tables, vec!["customers", "orders"]);
    assert!(outcome.report.failed_tables.is_empty());
}

#[tokio::test]
async fn truncated_reply_keeps_complete_leading_records() {
    let model = ScriptedModel::new();
    model.table_reply(
        "items",
        Reply::text(
            "Here are your records:\n[{\"id\": 1, \"name\": \"a\"}, {\"id\": 2, \"name\": \"b\"}, \
             {\"id\": 3, \"name\": \"c\"}, {\"id\": 4, \"name\": \"d\"}, {\"id\": 5, \"na",
        ),
    );

    let sql = "CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT);";
    let outcome = generator(&model)
        .generate_all_tables(&parse_schema(sql), sql, "ctx", 5, &NoProgress)
        .await
        .expect("generation succeeds");

    let ids: Vec<Value> = outcome.data["items"].iter().map(|r| r["id"].clone()).collect();
    assert_eq!(ids, vec![json!(1), json!(2), json!(3), json!(4)]);
    assert_eq!(outcome.report.completed_tables, vec!["items"]);
    assert_ne!(outcome.report.tables[0].strategy, Some(RecoveryStrategy::Direct));
}

#[tokio::test]
async fn record_count_tolerance_drives_retry() {
    let model = ScriptedModel::new();
    model.table_reply("enough", Reply::json(id_rows(41)));
    model.table_reply("short", Reply::json(id_rows(39)));
    model.table_reply("short", Reply::json(id_rows(50)));

    let sql = "CREATE TABLE enough (id INTEGER PRIMARY KEY, name TEXT); \
               CREATE TABLE short (id INTEGER PRIMARY KEY, name TEXT);";
    let outcome = generator(&model)
        .generate_all_tables(&parse_schema(sql), sql, "ctx", 50, &NoProgress)
        .await
        .expect("generation succeeds");

    assert_eq!(model.table_prompts("enough").len(), 1);
    assert_eq!(model.table_prompts("short").len(), 2);
    assert_eq!(outcome.data["enough"].len(), 41);
    assert_eq!(outcome.data["short"].len(), 50);
    assert_eq!(outcome.report.retries_total, 1);
    assert_eq!(outcome.report.completed_tables, vec!["enough", "short"]);
    assert!(outcome.progress.failed_tables.is_empty());
    assert_eq!(outcome.progress.current_table, None);
}

#[tokio::test]
async fn retry_happens_exactly_once() {
    let model = ScriptedModel::new();
    model.table_default("stubborn", Reply::json(id_rows(10)));

    let sql = "CREATE TABLE stubborn (id INTEGER PRIMARY KEY, name TEXT);";
    let progress = ProgressLog::default();
    let outcome = generator(&model)
        .generate_all_tables(&parse_schema(sql), sql, "ctx", 50, &progress)
        .await
        .expect("partial result is still a result");

    assert_eq!(model.table_prompts("stubborn").len(), 2);
    assert_eq!(outcome.report.failed_tables, vec!["stubborn"]);
    assert_eq!(outcome.data["stubborn"].len(), 10);
    assert_eq!(progress.percents().last(), Some(&100.0));
    assert_eq!(
        progress.messages().last().map(String::as_str),
        Some("Batch generation completed successfully!")
    );
}

#[tokio::test]
async fn isolated_table_failure_does_not_abort() {
    let model = ScriptedModel::new();
    model.table_reply("alpha", Reply::json(id_rows(5)));
    model.table_default("beta", Reply::Fail("connection reset".to_string()));
    model.table_reply("gamma", Reply::text("Sorry, I cannot do that."));
    model.table_reply("gamma", Reply::json(id_rows(5)));
    model.table_reply("delta", Reply::json(id_rows(5)));

    let sql = "CREATE TABLE alpha (id INTEGER PRIMARY KEY); CREATE TABLE beta (id INTEGER PRIMARY KEY); \
               CREATE TABLE gamma (id INTEGER PRIMARY KEY); CREATE TABLE delta (id INTEGER PRIMARY KEY);";
    let outcome = generator(&model)
        .generate_all_tables(&parse_schema(sql), sql, "ctx", 5, &NoProgress)
        .await
        .expect("generation succeeds");

    assert_eq!(model.table_call_order()[..4], ["alpha", "beta", "delta", "gamma"]);
    assert_eq!(outcome.report.failed_tables, vec!["beta"]);
    assert_eq!(outcome.report.completed_tables, vec!["alpha", "delta", "gamma"]);
    let beta = outcome
        .report
        .tables
        .iter()
        .find(|table| table.table == "beta")
        .expect("beta report");
    assert_eq!(beta.attempts, 2);
    assert!(beta.error.as_deref().unwrap_or_default().contains("connection reset"));
}

#[tokio::test]
async fn progress_is_monotonic_within_the_run() {
    let model = ScriptedModel::new();
    model.table_reply("customers", Reply::json(id_rows(2)));
    model.table_reply("orders", Reply::json(id_rows(1)));
    model.table_reply("orders", Reply::json(id_rows(2)));

    let schema = parse_schema(SHOP_SQL);
    let progress = ProgressLog::default();
    generator(&model)
        .generate_all_tables(&schema, SHOP_SQL, "ctx", 2, &progress)
        .await
        .expect("generation succeeds");

    let percents = progress.percents();
    assert!(percents.windows(2).all(|pair| pair[0] <= pair[1]), "{percents:?}");
    assert_eq!(percents.first(), Some(&5.0));
    assert_eq!(percents.last(), Some(&100.0));
    assert!(progress.messages().contains(&"Generating orders...".to_string()));
    assert!(progress.messages().contains(&"Retrying failed tables...".to_string()));
}

#[tokio::test]
async fn empty_schema_is_fatal() {
    let model = ScriptedModel::new();
    let progress = ProgressLog::default();
    let result = generator(&model)
        .generate_all_tables(&parse_schema("no tables here"), "", "ctx", 10, &progress)
        .await;

    assert!(matches!(result, Err(GenerationError::EmptySchema)));
    assert_eq!(progress.percents(), vec![-1.0]);
    assert!(model.requests().is_empty());
}

#[tokio::test]
async fn unreachable_model_is_fatal() {
    let model = ScriptedModel::new();
    let schema = parse_schema(SHOP_SQL);
    let progress = ProgressLog::default();
    let result = generator(&model)
        .generate_all_tables(&schema, SHOP_SQL, "ctx", 5, &progress)
        .await;

    assert!(matches!(result, Err(GenerationError::Llm(_))));
    assert_eq!(progress.percents().last(), Some(&-1.0));
    // two tables, one retry each
    assert_eq!(model.requests().len(), 4);
}

#[tokio::test]
async fn configurable_threshold_and_retry_passes() {
    let model = ScriptedModel::new();
    model.table_default("t", Reply::json(id_rows(30)));

    let settings = GeneratorSettings {
        validation_threshold: 0.5,
        retry_passes: 0,
        ..GeneratorSettings::default()
    };
    let sql = "CREATE TABLE t (id INTEGER PRIMARY KEY);";
    let outcome = BatchGenerator::new(model.clone(), settings)
        .generate_all_tables(&parse_schema(sql), sql, "ctx", 50, &NoProgress)
        .await
        .expect("generation succeeds");

    assert_eq!(outcome.report.completed_tables, vec!["t"]);
    assert_eq!(model.requests().len(), 1);
    assert_eq!(model.requests()[0].temperature, 0.3);
    assert_eq!(model.requests()[0].top_p, Some(0.8));
}
