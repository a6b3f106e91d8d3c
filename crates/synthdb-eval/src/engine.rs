use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde_json::Value;
use synthdb_core::{ForeignKeyRelation, ParsedSchema, Table};
use synthdb_generate::{GeneratedData, Record};
use synthdb_plan::{UNRANKED, parse_schema, resolve_dependencies};

use crate::errors::EvalError;
use crate::metrics::{
    GenerationMetrics, METRICS_VERSION, ReferentialCheck, TableMetrics, WarningItem,
};

/// Score generated data against its schema.
///
/// Tables are listed in generation order. A foreign key is only checked when
/// its parent table has rows.
pub fn collect_generation_metrics(
    schema: &ParsedSchema,
    schema_sql: &str,
    data: &GeneratedData,
    target_records: usize,
    threshold: f64,
) -> GenerationMetrics {
    let resolution = resolve_dependencies(schema_sql, &schema.table_names());
    let mut warnings = Vec::new();

    let mut tables: Vec<TableMetrics> = schema
        .tables
        .iter()
        .map(|table| {
            let records = rows(data, &table.name);
            let rows_found = records.len();
            let meets_threshold =
                rows_found > 0 && rows_found as f64 >= target_records as f64 * threshold;
            if !meets_threshold {
                warnings.push(WarningItem {
                    code: "below_threshold".to_string(),
                    path: table.name.clone(),
                    message: format!(
                        "{rows_found} of {target_records} rows, threshold {threshold}"
                    ),
                });
            }
            TableMetrics {
                table: table.name.clone(),
                generation_order: resolution.rank_of(&table.name).unwrap_or(UNRANKED),
                rows_found,
                rows_expected: target_records,
                meets_threshold,
                missing_columns: missing_columns(table, records),
            }
        })
        .collect();
    tables.sort_by_key(|table| table.generation_order);

    for name in data.keys() {
        if schema.table(name).is_none() {
            warnings.push(WarningItem {
                code: "unknown_table".to_string(),
                path: name.clone(),
                message: "table not declared in schema".to_string(),
            });
        }
    }

    let referential: Vec<ReferentialCheck> = resolution
        .relations
        .iter()
        .filter_map(|relation| check_relation(schema, data, relation, &mut warnings))
        .collect();

    let total_tables = schema.tables.len();
    let populated_tables = tables.iter().filter(|t| t.rows_found > 0).count();
    sort_warnings(&mut warnings);

    GenerationMetrics {
        metrics_version: METRICS_VERSION.to_string(),
        run_id: None,
        target_records,
        threshold,
        total_tables,
        populated_tables,
        population_ratio: ratio(populated_tables, total_tables, 0.0),
        total_records: tables.iter().map(|t| t.rows_found).sum(),
        tables,
        referential,
        warnings,
    }
}

fn check_relation(
    schema: &ParsedSchema,
    data: &GeneratedData,
    relation: &ForeignKeyRelation,
    warnings: &mut Vec<WarningItem>,
) -> Option<ReferentialCheck> {
    let child = canonical(schema, &relation.source_table)?;
    let parent = canonical(schema, &relation.target_table)?;
    let parent_rows = rows(data, parent);
    if parent_rows.is_empty() {
        warnings.push(WarningItem {
            code: "missing_parent_data".to_string(),
            path: format!("{child}.{}", relation.source_column),
            message: format!("parent table '{parent}' has no rows"),
        });
        return None;
    }

    let parent_keys: BTreeSet<String> = parent_rows
        .iter()
        .filter_map(|record| value_key(record, &relation.target_column))
        .collect();

    let mut checked = 0usize;
    let mut matched = 0usize;
    for record in rows(data, child) {
        let Some(key) = value_key(record, &relation.source_column) else {
            continue;
        };
        checked += 1;
        if parent_keys.contains(&key) {
            matched += 1;
        }
    }

    if matched < checked {
        warnings.push(WarningItem {
            code: "orphan_reference".to_string(),
            path: format!("{child}.{} -> {parent}.{}", relation.source_column, relation.target_column),
            message: format!("{} of {checked} values match no parent row", checked - matched),
        });
    }

    Some(ReferentialCheck {
        table: child.to_string(),
        column: relation.source_column.clone(),
        target_table: parent.to_string(),
        target_column: relation.target_column.clone(),
        checked,
        matched,
        ratio: ratio(matched, checked, 1.0),
    })
}

/// Load `schema.sql` and `data.json` from a run directory and score them.
pub fn evaluate_run_dir(
    run_dir: &Path,
    target_records: usize,
    threshold: f64,
) -> Result<GenerationMetrics, EvalError> {
    let schema_sql = fs::read_to_string(run_dir.join("schema.sql"))?;
    let schema = parse_schema(&schema_sql);
    if schema.is_empty() {
        return Err(EvalError::InvalidDataset(format!(
            "{} declares no tables",
            run_dir.join("schema.sql").display()
        )));
    }
    let data = read_generated_data(&run_dir.join("data.json"))?;

    let mut metrics = collect_generation_metrics(&schema, &schema_sql, &data, target_records, threshold);
    metrics.run_id = detect_run_id(run_dir);
    Ok(metrics)
}

/// Read a `{ "<table>": [ {...} ] }` JSON file.
pub fn read_generated_data(path: &Path) -> Result<GeneratedData, EvalError> {
    let value: Value = serde_json::from_str(&fs::read_to_string(path)?)?;
    if !value.is_object() {
        return Err(EvalError::InvalidDataset(format!(
            "{} is not a table map",
            path.display()
        )));
    }
    Ok(serde_json::from_value(value)?)
}

fn detect_run_id(run_dir: &Path) -> Option<String> {
    let name = run_dir.file_name()?.to_string_lossy();
    name.split_once("__run_")
        .map(|(_, run_part)| run_part.to_string())
}

fn rows<'a>(data: &'a GeneratedData, table: &str) -> &'a [Record] {
    data.get(table).map(Vec::as_slice).unwrap_or_default()
}

fn canonical<'a>(schema: &'a ParsedSchema, table: &str) -> Option<&'a str> {
    schema
        .tables
        .iter()
        .find(|candidate| candidate.name.eq_ignore_ascii_case(table))
        .map(|candidate| candidate.name.as_str())
}

fn missing_columns(table: &Table, records: &[Record]) -> Vec<String> {
    if records.is_empty() {
        return Vec::new();
    }
    table
        .columns
        .iter()
        .filter(|column| records.iter().all(|record| !record.contains_key(&column.name)))
        .map(|column| column.name.clone())
        .collect()
}

/// JSON text of a non-null field, so `1` and `"1"` stay distinct.
fn value_key(record: &Record, column: &str) -> Option<String> {
    record
        .get(column)
        .filter(|value| !value.is_null())
        .map(Value::to_string)
}

fn ratio(part: usize, whole: usize, empty: f64) -> f64 {
    if whole == 0 {
        empty
    } else {
        part as f64 / whole as f64
    }
}

fn sort_warnings(warnings: &mut [WarningItem]) {
    warnings.sort_by(|a, b| (&a.path, &a.code).cmp(&(&b.path, &b.code)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(value: Value) -> Vec<Record> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(map) => Some(map),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    #[test]
    fn json_text_keeps_types_apart() {
        let rows = records(json!([{"id": 1}, {"id": "1"}, {"id": null}]));
        assert_eq!(value_key(&rows[0], "id").as_deref(), Some("1"));
        assert_eq!(value_key(&rows[1], "id").as_deref(), Some("\"1\""));
        assert_eq!(value_key(&rows[2], "id"), None);
        assert_eq!(value_key(&rows[0], "missing"), None);
    }

    #[test]
    fn run_id_comes_from_directory_name() {
        let dir = Path::new("/tmp/runs/2026-01-01T00-00-00Z__run_abc123");
        assert_eq!(detect_run_id(dir).as_deref(), Some("abc123"));
        assert_eq!(detect_run_id(Path::new("/tmp/elsewhere")), None);
    }

    #[test]
    fn missing_columns_ignore_empty_tables() {
        let schema = parse_schema("CREATE TABLE t (id INTEGER, name TEXT, note TEXT);");
        let table = &schema.tables[0];
        assert!(missing_columns(table, &[]).is_empty());

        let rows = records(json!([{"id": 1, "name": "a"}, {"id": 2}]));
        assert_eq!(missing_columns(table, &rows), vec!["note".to_string()]);
    }
}
