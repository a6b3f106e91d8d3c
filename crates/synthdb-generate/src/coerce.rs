//! Explicit coercion of model-authored values into each column's standard type.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use synthdb_core::{SchemaInfo, StandardType};

use crate::model::Record;

static INTEGER_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+").expect("valid regex"));
static DECIMAL_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("valid regex"));
static DATE_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4}-\d{2}-\d{2})(?:[ T](\d{2}:\d{2}:\d{2}))?").expect("valid regex")
});

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A value after coercion, tagged by the shape it ended up in.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Decimal(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Json(Value),
}

impl FieldValue {
    /// Value used when a column is missing or cannot be converted.
    pub fn default_for(standard_type: StandardType) -> Self {
        match standard_type {
            StandardType::Integer => FieldValue::Int(1),
            StandardType::Decimal => FieldValue::Decimal(0.0),
            StandardType::Boolean => FieldValue::Bool(false),
            StandardType::Date => FieldValue::Date(default_date()),
            StandardType::DateTime => {
                FieldValue::DateTime(default_date().and_hms_opt(12, 0, 0).unwrap_or_default())
            }
            StandardType::String | StandardType::Text | StandardType::Json => {
                FieldValue::Text("default".to_string())
            }
        }
    }

    pub fn into_json(self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(value) => Value::Bool(value),
            FieldValue::Int(value) => Value::from(value),
            FieldValue::Decimal(value) => serde_json::Number::from_f64(value)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::Text(value) => Value::String(value),
            FieldValue::Date(value) => Value::String(value.format(DATE_FORMAT).to_string()),
            FieldValue::DateTime(value) => {
                Value::String(value.format(DATETIME_FORMAT).to_string())
            }
            FieldValue::Json(value) => value,
        }
    }
}

fn default_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default()
}

/// How [`coerce_record`] treats columns the record does not carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoercionPolicy {
    /// Leave absent columns absent.
    #[default]
    KeepMissing,
    /// Give absent columns the type default.
    FillMissing,
}

pub fn coerce_value(value: &Value, standard_type: StandardType) -> FieldValue {
    if value.is_null() {
        return FieldValue::Null;
    }
    convert(value, standard_type).unwrap_or_else(|| FieldValue::default_for(standard_type))
}

fn convert(value: &Value, standard_type: StandardType) -> Option<FieldValue> {
    match standard_type {
        StandardType::Integer => match value {
            Value::Number(number) => number
                .as_i64()
                .or_else(|| number.as_f64().map(|f| f.trunc() as i64))
                .map(FieldValue::Int),
            Value::String(text) => INTEGER_TEXT
                .find(text)
                .and_then(|found| found.as_str().parse().ok())
                .map(FieldValue::Int),
            Value::Bool(flag) => Some(FieldValue::Int(i64::from(*flag))),
            _ => None,
        },
        StandardType::Decimal => match value {
            Value::Number(number) => number.as_f64().map(FieldValue::Decimal),
            Value::String(text) => DECIMAL_TEXT
                .find(text)
                .and_then(|found| found.as_str().parse().ok())
                .map(FieldValue::Decimal),
            Value::Bool(flag) => Some(FieldValue::Decimal(if *flag { 1.0 } else { 0.0 })),
            _ => None,
        },
        StandardType::Boolean => match value {
            Value::Bool(flag) => Some(FieldValue::Bool(*flag)),
            Value::String(text) => Some(FieldValue::Bool(matches!(
                text.trim().to_lowercase().as_str(),
                "true" | "1" | "yes" | "on"
            ))),
            Value::Number(number) => Some(FieldValue::Bool(number.as_f64() != Some(0.0))),
            _ => None,
        },
        StandardType::Date | StandardType::DateTime => match value {
            Value::String(text) => Some(temporal(text, standard_type)),
            other => Some(FieldValue::Text(stringify(other))),
        },
        StandardType::Json => match value {
            Value::Object(_) | Value::Array(_) => Some(FieldValue::Json(value.clone())),
            other => Some(FieldValue::Text(stringify(other))),
        },
        StandardType::String | StandardType::Text => Some(FieldValue::Text(stringify(value))),
    }
}

fn temporal(text: &str, standard_type: StandardType) -> FieldValue {
    let Some(caps) = DATE_TEXT.captures(text) else {
        return FieldValue::Text(text.to_string());
    };
    let Ok(date) = NaiveDate::parse_from_str(&caps[1], DATE_FORMAT) else {
        return FieldValue::Text(text.to_string());
    };

    if standard_type == StandardType::DateTime {
        if let Some(time) = caps.get(2) {
            let joined = format!("{} {}", &caps[1], time.as_str());
            if let Ok(datetime) = NaiveDateTime::parse_from_str(&joined, DATETIME_FORMAT) {
                return FieldValue::DateTime(datetime);
            }
        }
    }
    FieldValue::Date(date)
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Coerce every known column of `record`; unknown keys pass through.
pub fn coerce_record(record: &Record, schema_info: &SchemaInfo, policy: CoercionPolicy) -> Record {
    let mut cleaned = record.clone();
    for column in &schema_info.columns {
        match record.get(&column.name) {
            Some(value) => {
                cleaned.insert(
                    column.name.clone(),
                    coerce_value(value, column.standard_type).into_json(),
                );
            }
            None if policy == CoercionPolicy::FillMissing => {
                cleaned.insert(
                    column.name.clone(),
                    FieldValue::default_for(column.standard_type).into_json(),
                );
            }
            None => {}
        }
    }
    cleaned
}

pub fn coerce_records(
    records: Vec<Record>,
    schema_info: &SchemaInfo,
    policy: CoercionPolicy,
) -> Vec<Record> {
    records
        .iter()
        .map(|record| coerce_record(record, schema_info, policy))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use synthdb_core::{ColumnMetadata, analyze_table_schema};

    #[test]
    fn integers_from_numbers_and_text() {
        assert_eq!(coerce_value(&json!(41.9), StandardType::Integer), FieldValue::Int(41));
        assert_eq!(coerce_value(&json!("Order #-12"), StandardType::Integer), FieldValue::Int(-12));
        assert_eq!(coerce_value(&json!("none"), StandardType::Integer), FieldValue::Int(1));
        assert_eq!(coerce_value(&json!(null), StandardType::Integer), FieldValue::Null);
    }

    #[test]
    fn decimals_and_booleans() {
        assert_eq!(
            coerce_value(&json!("$29.99 USD"), StandardType::Decimal),
            FieldValue::Decimal(29.99)
        );
        assert_eq!(coerce_value(&json!("Yes"), StandardType::Boolean), FieldValue::Bool(true));
        assert_eq!(coerce_value(&json!("nope"), StandardType::Boolean), FieldValue::Bool(false));
        assert_eq!(coerce_value(&json!(2), StandardType::Boolean), FieldValue::Bool(true));
        assert_eq!(coerce_value(&json!([1]), StandardType::Boolean), FieldValue::Bool(false));
    }

    #[test]
    fn dates_keep_time_only_for_datetime() {
        let ts = json!("2024-03-05T10:20:30Z");
        assert_eq!(
            coerce_value(&ts, StandardType::DateTime).into_json(),
            json!("2024-03-05 10:20:30")
        );
        assert_eq!(coerce_value(&ts, StandardType::Date).into_json(), json!("2024-03-05"));
        assert_eq!(
            coerce_value(&json!("next tuesday"), StandardType::Date),
            FieldValue::Text("next tuesday".to_string())
        );
        assert_eq!(
            coerce_value(&json!("2024-13-45"), StandardType::Date),
            FieldValue::Text("2024-13-45".to_string())
        );
    }

    #[test]
    fn json_and_text() {
        assert_eq!(
            coerce_value(&json!({"a": 1}), StandardType::Json).into_json(),
            json!({"a": 1})
        );
        assert_eq!(coerce_value(&json!(7), StandardType::String).into_json(), json!("7"));
        assert_eq!(coerce_value(&json!(true), StandardType::Text).into_json(), json!("true"));
    }

    #[test]
    fn record_policy_controls_missing_columns() {
        let info = analyze_table_schema(&[
            ColumnMetadata::from((0, "id".to_string(), "INTEGER".to_string(), true, None, true)),
            ColumnMetadata::from((1, "price".to_string(), "TEXT".to_string(), false, None, false)),
            ColumnMetadata::from((2, "created_at".to_string(), "TEXT".to_string(), false, None, false)),
        ]);
        let record = json!({"id": "7", "price": "12.50", "extra": "kept"})
            .as_object()
            .cloned()
            .unwrap();

        let kept = coerce_record(&record, &info, CoercionPolicy::KeepMissing);
        assert_eq!(
            Value::Object(kept),
            json!({"id": 7, "price": 12.5, "extra": "kept"})
        );

        let filled = coerce_record(&record, &info, CoercionPolicy::FillMissing);
        assert_eq!(filled["created_at"], json!("2024-01-01 12:00:00"));
    }
}
