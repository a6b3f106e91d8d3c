//! Single-call generation path: one prompt asks for every table at once.
//!
//! Kept as the fallback for the batch pipeline and as the baseline for
//! method comparison.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde_json::{Map, Value};
use synthdb_core::types::{NameFamily, matches_family};
use synthdb_core::{
    GenerationHints, ParsedSchema, SchemaInfo, StandardType, Table, analyze_table_schema,
    get_data_generation_hints, is_foreign_key_name, singularize, table_metadata,
};
use tracing::{info, warn};

use crate::coerce::{CoercionPolicy, coerce_records};
use crate::llm::{CompletionRequest, LanguageModel};
use crate::model::{GeneratedData, Record};
use crate::prompts::{LEGACY_SYSTEM_PROMPT, legacy_prompt, legacy_table_spec};
use crate::recovery::fix_common_issues;
use crate::request::DatabaseRequest;

/// Columns listed per table in the prompt.
pub const MAX_PROMPT_COLUMNS: usize = 8;
/// Upper bound on rows synthesized by the deterministic fallback.
pub const FALLBACK_ROW_LIMIT: usize = 15;

static OUTER_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("valid regex"));
static FLAT_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[^}]+\}").expect("valid regex"));
static FIRST_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));

/// Data produced by the single-call path.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyOutcome {
    pub data: GeneratedData,
    /// True when the rows came from the deterministic fallback.
    pub used_fallback: bool,
}

struct AnalyzedTable<'a> {
    table: &'a Table,
    schema_info: SchemaInfo,
    hints: GenerationHints,
}

#[derive(Clone)]
pub struct LegacyGenerator {
    llm: Arc<dyn LanguageModel>,
}

impl LegacyGenerator {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// Generate rows for every table with one model call. Never fails: a
    /// model error or unparseable reply falls back to synthesized rows.
    pub async fn generate_sample_data_legacy(
        &self,
        schema: &ParsedSchema,
        request: &DatabaseRequest,
    ) -> LegacyOutcome {
        if schema.is_empty() {
            return LegacyOutcome {
                data: GeneratedData::new(),
                used_fallback: false,
            };
        }

        let analyzed: Vec<AnalyzedTable<'_>> = schema
            .tables
            .iter()
            .map(|table| {
                let schema_info = analyze_table_schema(&table_metadata(table));
                let hints = get_data_generation_hints(&schema_info);
                AnalyzedTable {
                    table,
                    schema_info,
                    hints,
                }
            })
            .collect();

        let specs: Vec<String> = analyzed
            .iter()
            .map(|entry| {
                legacy_table_spec(
                    &entry.table.name,
                    &entry.schema_info,
                    &entry.hints,
                    MAX_PROMPT_COLUMNS,
                )
            })
            .collect();
        let completion = CompletionRequest::new(LEGACY_SYSTEM_PROMPT, legacy_prompt(request, &specs))
            .with_temperature(0.5)
            .with_max_tokens(3000);

        let row_count = FIRST_NUMBER
            .find(request.sample_size.legacy_range())
            .and_then(|found| found.as_str().parse().ok())
            .unwrap_or(10);

        let content = match self.llm.complete(&completion).await {
            Ok(content) => content,
            Err(err) => {
                warn!(error = %err, "single-call generation failed, using fallback rows");
                return fallback_outcome(&analyzed, row_count);
            }
        };

        let names = schema.table_names();
        let Some(parsed) = parse_tables(&content, &names) else {
            warn!(chars = content.len(), "all single-call parsing strategies failed");
            return fallback_outcome(&analyzed, row_count);
        };

        let mut data = GeneratedData::new();
        for entry in &analyzed {
            if let Some(records) = parsed.get(&entry.table.name) {
                data.insert(
                    entry.table.name.clone(),
                    coerce_records(records.clone(), &entry.schema_info, CoercionPolicy::FillMissing),
                );
            }
        }
        info!(tables = data.len(), "generated single-call sample data");

        LegacyOutcome {
            data,
            used_fallback: false,
        }
    }
}

fn fallback_outcome(analyzed: &[AnalyzedTable<'_>], row_count: usize) -> LegacyOutcome {
    let data = analyzed
        .iter()
        .map(|entry| {
            (
                entry.table.name.clone(),
                fallback_rows(entry.table, &entry.schema_info, row_count),
            )
        })
        .collect();
    LegacyOutcome {
        data,
        used_fallback: true,
    }
}

/// Parse `{ "<table>": [ ... ] }`, keeping only tables in `tables`.
///
/// Tries the cleaned reply, then the outermost `{...}` block, then a
/// line-by-line reconstruction.
pub fn parse_tables(content: &str, tables: &[String]) -> Option<GeneratedData> {
    let parsed = parse_object(&clean_object_reply(content))
        .or_else(|| {
            OUTER_OBJECT
                .find(content)
                .and_then(|found| parse_object(&clean_object_reply(found.as_str())))
        })
        .map(|map| keep_known_tables(map, tables))
        .filter(|data| !data.is_empty())
        .or_else(|| reconstruct_from_lines(content, tables));

    parsed.filter(|data| !data.is_empty())
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text).ok()? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

fn keep_known_tables(map: Map<String, Value>, tables: &[String]) -> GeneratedData {
    map.into_iter()
        .filter(|(name, _)| tables.contains(name))
        .filter_map(|(name, value)| match value {
            Value::Array(items) => Some((name, objects(items))),
            _ => None,
        })
        .collect()
}

fn objects(items: Vec<Value>) -> Vec<Record> {
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect()
}

fn clean_object_reply(content: &str) -> String {
    let text = content.replace("```json", "");
    let text = text.trim().trim_end_matches("```");
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.iter().position(|line| line.trim().starts_with('{'));
    let end = lines.iter().rposition(|line| line.trim().ends_with('}'));
    let body = match (start, end) {
        (Some(start), Some(end)) if start <= end => lines[start..=end].join("\n"),
        _ => text.to_string(),
    };
    fix_common_issues(&body).trim().to_string()
}

fn reconstruct_from_lines(content: &str, tables: &[String]) -> Option<GeneratedData> {
    let mut data = GeneratedData::new();
    let mut current: Option<String> = None;

    for line in content.lines().map(str::trim) {
        if line.contains(':') {
            if let Some(name) = tables.iter().find(|name| {
                line.contains(&format!("\"{name}\"")) || line.starts_with(name.as_str())
            }) {
                current = Some(name.clone());
            }
        }

        let Some(table) = current.as_ref() else {
            continue;
        };
        if let Some(record) = FLAT_OBJECT
            .find(line)
            .and_then(|found| serde_json::from_str::<Value>(found.as_str()).ok())
            .and_then(|value| match value {
                Value::Object(map) => Some(map),
                _ => None,
            })
        {
            data.entry(table.clone()).or_default().push(record);
        }
    }

    (!data.is_empty()).then_some(data)
}

/// Deterministic rows derived from column names and types.
pub fn fallback_rows(table: &Table, schema_info: &SchemaInfo, requested: usize) -> Vec<Record> {
    let singular = singularize(&table.name);
    (0..requested.min(FALLBACK_ROW_LIMIT))
        .map(|i| {
            schema_info
                .columns
                .iter()
                .map(|column| {
                    (
                        column.name.clone(),
                        fallback_value(&column.name, column.standard_type, &singular, i),
                    )
                })
                .collect()
        })
        .collect()
}

fn fallback_value(name: &str, standard_type: StandardType, singular: &str, i: usize) -> Value {
    let lower = name.to_lowercase();
    let ordinal = i as i64 + 1;
    let day = i % 28 + 1;

    if lower == "id" || is_foreign_key_name(name) {
        return Value::from(ordinal);
    }
    if lower.contains("name") {
        return Value::from(format!("Sample {singular} {ordinal}"));
    }
    if matches_family(name, NameFamily::Price) {
        return Value::from(10.0 + i as f64 * 5.0);
    }
    if lower.contains("date") {
        return Value::from(format!("2024-01-{day:02}"));
    }

    match standard_type {
        StandardType::Integer => Value::from(ordinal),
        StandardType::Decimal => Value::from((i as f64 * 1.5 * 100.0).round() / 100.0),
        StandardType::Boolean => Value::from(i % 2 == 0),
        StandardType::Date => Value::from(format!("2024-01-{day:02}")),
        StandardType::DateTime => Value::from(format!("2024-01-{day:02} 12:00:00")),
        _ => Value::from(format!("Value {ordinal}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use synthdb_core::Column;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_fenced_object_and_drops_unknown_tables() {
        let reply = "```json\n{\"customers\": [{\"id\": 1}, {\"id\": 2},], \"ghosts\": [{\"id\": 9}]}\n```";
        let data = parse_tables(reply, &names(&["customers", "orders"])).expect("data");
        assert_eq!(data.len(), 1);
        assert_eq!(data["customers"].len(), 2);
    }

    #[test]
    fn extracts_outer_object_from_prose() {
        let reply = "Here is the data: {\"orders\": [{\"id\": 1}]} Hope it helps!";
        let data = parse_tables(reply, &names(&["orders"])).expect("data");
        assert_eq!(data["orders"][0]["id"], json!(1));
    }

    #[test]
    fn reconstructs_tables_line_by_line() {
        let reply = "customers:\n  {\"id\": 1, \"name\": \"Ann\"}\n  {\"id\": 2, broken}\norders:\n  {\"id\": 7}";
        let data = parse_tables(reply, &names(&["customers", "orders"])).expect("data");
        assert_eq!(data["customers"].len(), 1);
        assert_eq!(data["orders"][0]["id"], json!(7));
        assert!(parse_tables("no data today", &names(&["orders"])).is_none());
    }

    #[test]
    fn fallback_rows_are_deterministic_and_capped() {
        let table = Table {
            name: "products".to_string(),
            columns: vec![
                Column::new("id", "INTEGER"),
                Column::new("name", "TEXT"),
                Column::new("price", "DECIMAL"),
                Column::new("in_stock", "BOOLEAN"),
                Column::new("category_id", "INTEGER"),
            ],
            sql: String::new(),
        };
        let info = analyze_table_schema(&table_metadata(&table));
        let rows = fallback_rows(&table, &info, 40);

        assert_eq!(rows.len(), FALLBACK_ROW_LIMIT);
        assert_eq!(
            Value::Object(rows[1].clone()),
            json!({"id": 2, "name": "Sample product 2", "price": 15.0, "in_stock": false, "category_id": 2})
        );
        assert_eq!(rows, fallback_rows(&table, &info, 40));
    }
}
