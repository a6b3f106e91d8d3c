//! Best-effort `CREATE TABLE` parsing of model-authored SQL.
//!
//! Lossy on purpose: anything that does not look like `<name> <type> ...`
//! inside a table body is skipped, and text without `CREATE TABLE` yields an
//! empty schema rather than an error.

use std::sync::LazyLock;

use regex::Regex;
use synthdb_core::{Column, ParsedSchema, Table};
use tracing::debug;

static CREATE_TABLE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)CREATE\s+TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?[`"\[]?(\w+)[`"\]]?\s*\((.*?)\)\s*(?:;|\z)"#,
    )
    .expect("valid regex")
});

const CONSTRAINT_PREFIXES: &[&str] = &[
    "PRIMARY", "FOREIGN", "CONSTRAINT", "INDEX", "UNIQUE", "CHECK", "KEY",
];

pub fn parse_schema(raw_sql: &str) -> ParsedSchema {
    let tables: Vec<Table> = CREATE_TABLE_BLOCK
        .captures_iter(raw_sql)
        .map(|caps| Table {
            name: caps[1].to_string(),
            columns: parse_columns(&caps[2]),
            sql: caps[0].trim().to_string(),
        })
        .collect();

    debug!(tables = tables.len(), "parsed schema");

    ParsedSchema {
        raw_sql: raw_sql.to_string(),
        tables,
    }
}

fn parse_columns(body: &str) -> Vec<Column> {
    let without_comments: Vec<&str> = body
        .lines()
        .map(|line| line.split("--").next().unwrap_or_default())
        .collect();

    split_top_level(&without_comments.join("\n"))
        .into_iter()
        .filter_map(|segment| parse_column(&segment))
        .collect()
}

fn parse_column(segment: &str) -> Option<Column> {
    let definition = segment.split_whitespace().collect::<Vec<_>>().join(" ");
    let upper = definition.to_uppercase();
    let first = upper
        .split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or_default();
    if first.is_empty() || CONSTRAINT_PREFIXES.contains(&first) {
        return None;
    }

    let (name, rest) = definition.split_once(' ')?;
    let declared_type = leading_type(rest);
    if declared_type.is_empty() {
        return None;
    }

    let mut column = Column::new(
        name.trim_matches(|c| matches!(c, '`' | '"' | '[' | ']')),
        declared_type,
    );
    column.definition = Some(definition.clone());
    Some(column)
}

/// First whitespace-delimited type token, keeping a parenthesized size
/// qualifier together (`DECIMAL(10, 2)`).
fn leading_type(rest: &str) -> String {
    let mut depth = 0usize;
    let mut end = rest.len();
    for (idx, ch) in rest.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            c if c.is_whitespace() && depth == 0 => {
                if rest[idx..].trim_start().starts_with('(') {
                    continue;
                }
                end = idx;
                break;
            }
            _ => {}
        }
    }
    rest[..end].split_whitespace().collect::<Vec<_>>().join(" ")
}

fn split_top_level(body: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for ch in body.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if depth == 0 => segments.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    segments.push(current);

    segments
}
