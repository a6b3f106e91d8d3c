use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::clean::close_unterminated_string;
use crate::model::Record;

static OBJECT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{[^{}]*(?:\{[^{}]*\}[^{}]*)*\}").expect("valid regex")
});
static OBJECT_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\}\s*,\s*\{").expect("valid regex"));

fn into_record(value: Value) -> Option<Record> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

fn array_records(text: &str) -> Option<Vec<Record>> {
    match serde_json::from_str::<Value>(text).ok()? {
        Value::Array(items) => Some(items.into_iter().filter_map(into_record).collect()),
        _ => None,
    }
}

fn object_record(text: &str) -> Option<Record> {
    serde_json::from_str::<Value>(text).ok().and_then(into_record)
}

/// Strategy 1: the text is already a JSON array.
pub fn direct_parse(content: &str) -> Option<Vec<Record>> {
    array_records(content)
}

/// Strategy 2: close unterminated strings line by line, then parse.
pub fn line_repair(content: &str) -> Option<Vec<Record>> {
    let repaired: Vec<String> = content.lines().map(close_unterminated_string).collect();
    array_records(&repaired.join("\n"))
}

/// Strategy 3: parse every balanced `{...}` (one level of nesting) on its own.
pub fn object_extraction(content: &str) -> Option<Vec<Record>> {
    Some(
        OBJECT_PATTERN
            .find_iter(content)
            .filter_map(|found| object_record(found.as_str()))
            .collect(),
    )
}

/// Strategy 4: split the array body on `},{` and repair each fragment.
pub fn split_repair(content: &str) -> Option<Vec<Record>> {
    let start = content.find('[')?;
    let end = content.rfind(']')?;
    if start >= end {
        return None;
    }

    let inner = content[start + 1..end].trim();
    if inner.is_empty() {
        return Some(Vec::new());
    }

    let records = OBJECT_BOUNDARY
        .split(inner)
        .filter_map(|fragment| {
            let mut part = fragment.trim().to_string();
            if !part.starts_with('{') {
                part.insert(0, '{');
            }
            if !part.ends_with('}') {
                part.push('}');
            }
            object_record(&part).or_else(|| object_record(&repair_fragment(&part)))
        })
        .collect();
    Some(records)
}

fn repair_fragment(fragment: &str) -> String {
    fragment
        .lines()
        .map(|line| {
            let line = line.trim();
            if line.contains(':') {
                close_unterminated_string(line)
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Strategy 5: walk the array and keep every complete top-level object.
///
/// Tracks string and escape state so braces inside strings do not count.
/// An object cut off by the end of the text is dropped.
pub fn streaming_truncation(content: &str) -> Option<Vec<Record>> {
    let start = content.find('[')?;
    let mut records = Vec::new();
    let mut buffer = String::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for ch in content[start + 1..].chars() {
        if in_string {
            buffer.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => {
                in_string = true;
                buffer.push(ch);
            }
            '{' => {
                depth += 1;
                buffer.push(ch);
            }
            '}' => {
                depth = depth.saturating_sub(1);
                buffer.push(ch);
                if depth == 0 {
                    if let Some(record) = object_record(buffer.trim()) {
                        records.push(record);
                    }
                    buffer.clear();
                }
            }
            ']' if depth == 0 => break,
            ',' if depth == 0 => buffer.clear(),
            _ => buffer.push(ch),
        }
    }

    Some(records)
}
