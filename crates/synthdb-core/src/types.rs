use std::sync::LazyLock;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Normalized column taxonomy every declared SQL type is mapped into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StandardType {
    Integer,
    String,
    Decimal,
    Date,
    #[serde(rename = "datetime")]
    DateTime,
    Boolean,
    Text,
    Json,
}

impl StandardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StandardType::Integer => "integer",
            StandardType::String => "string",
            StandardType::Decimal => "decimal",
            StandardType::Date => "date",
            StandardType::DateTime => "datetime",
            StandardType::Boolean => "boolean",
            StandardType::Text => "text",
            StandardType::Json => "json",
        }
    }

    pub fn is_textual(&self) -> bool {
        matches!(self, StandardType::String | StandardType::Text)
    }
}

impl std::fmt::Display for StandardType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

static SIZE_QUALIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\s*\d+(?:\s*,\s*\d+)?\s*\)").expect("valid regex"));

/// Column name families used by the name-based overrides and generation hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameFamily {
    Price,
    Temporal,
    Flag,
    Identifier,
    Label,
}

struct NamePatterns {
    price: Vec<Regex>,
    temporal: Vec<Regex>,
    flag: Vec<Regex>,
    identifier: Vec<Regex>,
    label: Vec<Regex>,
    camel_id: Regex,
}

static NAME_PATTERNS: LazyLock<NamePatterns> = LazyLock::new(|| NamePatterns {
    price: compile(&[
        r"^price$", r"^cost$", r"^amount$", r"^total$", r"_price$", r"_cost$", r"_amount$",
        r"_total$", r"^value$",
    ]),
    temporal: compile(&[
        r"_date$", r"_time$", r"^created", r"^updated", r"^modified", r"^timestamp$", r"^date_",
    ]),
    flag: compile(&[
        r"^is_", r"^has_", r"^can_", r"_flag$", r"^active$", r"^enabled$", r"^visible$",
        r"_status$",
    ]),
    identifier: compile(&[r"^id$", r"_id$", r"^pk_", r"^primary_key$"]),
    label: compile(&[r"^name$", r"_name$", r"^title$", r"^label$", r"^description$"]),
    camel_id: Regex::new(r"[a-z0-9]Id$").expect("valid regex"),
});

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|pattern| Regex::new(pattern).expect("valid regex"))
        .collect()
}

fn any_match(patterns: &[Regex], text: &str) -> bool {
    patterns.iter().any(|pattern| pattern.is_match(text))
}

/// Returns true when `name` belongs to the given naming family.
pub fn matches_family(name: &str, family: NameFamily) -> bool {
    let lower = name.to_lowercase();
    let patterns = &*NAME_PATTERNS;
    match family {
        NameFamily::Price => any_match(&patterns.price, &lower),
        NameFamily::Temporal => any_match(&patterns.temporal, &lower),
        NameFamily::Flag => any_match(&patterns.flag, &lower),
        NameFamily::Identifier => {
            any_match(&patterns.identifier, &lower) || patterns.camel_id.is_match(name)
        }
        NameFamily::Label => any_match(&patterns.label, &lower),
    }
}

/// Normalize a declared SQL type into a canonical upper-case token.
///
/// Size qualifiers are stripped (`VARCHAR(255)` -> `VARCHAR`) and known
/// synonyms collapse into a single spelling. Unknown types are returned
/// upper-cased without qualifiers.
pub fn normalize_sql_type(declared: &str) -> String {
    if declared.trim().is_empty() {
        return "TEXT".to_string();
    }

    let clean = SIZE_QUALIFIER
        .replace_all(declared, "")
        .trim()
        .to_uppercase();

    let normalized = if clean.contains("CHAR") {
        "VARCHAR"
    } else if clean.contains("INT") || clean.contains("SERIAL") {
        "INTEGER"
    } else if ["DECIMAL", "NUMERIC", "FLOAT", "DOUBLE", "REAL", "MONEY"]
        .iter()
        .any(|token| clean.contains(token))
    {
        "DECIMAL"
    } else if clean.contains("DATE") && clean.contains("TIME") {
        "DATETIME"
    } else if clean.contains("DATE") {
        "DATE"
    } else if clean.contains("TIME") {
        "DATETIME"
    } else if clean.contains("BOOL") {
        "BOOLEAN"
    } else if clean.contains("TEXT") || clean.contains("CLOB") {
        "TEXT"
    } else if clean.contains("JSON") {
        "JSON"
    } else {
        return clean;
    };

    normalized.to_string()
}

/// Direct lookup from a normalized type token to the standard taxonomy.
pub fn map_normalized_type(normalized: &str) -> StandardType {
    match normalized {
        "INTEGER" => StandardType::Integer,
        "VARCHAR" | "STRING" => StandardType::String,
        "DECIMAL" | "NUMBER" | "CURRENCY" => StandardType::Decimal,
        "DATETIME" => StandardType::DateTime,
        "DATE" => StandardType::Date,
        "BOOLEAN" => StandardType::Boolean,
        "TEXT" | "BLOB" => StandardType::Text,
        "JSON" => StandardType::Json,
        _ => StandardType::String,
    }
}

/// Name-based override, evaluated price -> temporal -> flag -> identifier.
pub fn name_override(column_name: &str) -> Option<StandardType> {
    if matches_family(column_name, NameFamily::Price) {
        Some(StandardType::Decimal)
    } else if matches_family(column_name, NameFamily::Temporal) {
        Some(StandardType::DateTime)
    } else if matches_family(column_name, NameFamily::Flag) {
        Some(StandardType::Boolean)
    } else if matches_family(column_name, NameFamily::Identifier) {
        Some(StandardType::Integer)
    } else {
        None
    }
}

/// Infer the standard type for a column. Pure in `(declared, column_name)`.
pub fn infer_standard_type(declared: &str, column_name: &str) -> StandardType {
    name_override(column_name)
        .unwrap_or_else(|| map_normalized_type(&normalize_sql_type(declared)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_sizes_and_synonyms() {
        assert_eq!(normalize_sql_type("varchar(255)"), "VARCHAR");
        assert_eq!(normalize_sql_type("CHAR(2)"), "VARCHAR");
        assert_eq!(normalize_sql_type("bigint"), "INTEGER");
        assert_eq!(normalize_sql_type("SERIAL"), "INTEGER");
        assert_eq!(normalize_sql_type("DECIMAL(10, 2)"), "DECIMAL");
        assert_eq!(normalize_sql_type("double precision"), "DECIMAL");
        assert_eq!(normalize_sql_type("TIMESTAMP"), "DATETIME");
        assert_eq!(normalize_sql_type("datetime"), "DATETIME");
        assert_eq!(normalize_sql_type("date"), "DATE");
        assert_eq!(normalize_sql_type("bool"), "BOOLEAN");
        assert_eq!(normalize_sql_type("CLOB"), "TEXT");
        assert_eq!(normalize_sql_type("jsonb"), "JSON");
        assert_eq!(normalize_sql_type(""), "TEXT");
        assert_eq!(normalize_sql_type("uuid"), "UUID");
    }

    #[test]
    fn unknown_types_fall_back_to_string() {
        assert_eq!(infer_standard_type("UUID", "token"), StandardType::String);
        assert_eq!(infer_standard_type("GEOMETRY", "shape"), StandardType::String);
    }

    #[test]
    fn name_overrides_win_over_declared_type() {
        assert_eq!(infer_standard_type("INTEGER", "unit_price"), StandardType::Decimal);
        assert_eq!(infer_standard_type("TEXT", "created_at"), StandardType::DateTime);
        assert_eq!(infer_standard_type("DATE", "birth_date"), StandardType::DateTime);
        assert_eq!(infer_standard_type("TEXT", "is_active"), StandardType::Boolean);
        assert_eq!(infer_standard_type("TEXT", "customer_id"), StandardType::Integer);
        assert_eq!(infer_standard_type("TEXT", "customerId"), StandardType::Integer);
    }

    #[test]
    fn price_beats_identifier_family() {
        assert_eq!(infer_standard_type("INTEGER", "total"), StandardType::Decimal);
        assert_eq!(infer_standard_type("TEXT", "price"), StandardType::Decimal);
    }

    #[test]
    fn lowercase_id_suffix_is_not_camel_case() {
        assert!(!matches_family("paid", NameFamily::Identifier));
        assert_eq!(infer_standard_type("TEXT", "paid"), StandardType::Text);
    }

    #[test]
    fn inference_is_repeatable() {
        let pairs = [
            ("VARCHAR(100)", "email"),
            ("INTEGER", "quantity"),
            ("REAL", "discount_amount"),
            ("TEXT", "order_status"),
        ];
        for (declared, name) in pairs {
            let first = infer_standard_type(declared, name);
            for _ in 0..3 {
                assert_eq!(infer_standard_type(declared, name), first);
            }
        }
    }
}
