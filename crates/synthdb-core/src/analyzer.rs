//! Column analysis and data-generation hints.
//!
//! Input is the tuple shape of a `PRAGMA table_info` style call. Nothing in
//! here fails: unrecognized declared types fall back to the string family.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constraints::ColumnConstraint;
use crate::inflection::{ReferenceGuess, guess_reference};
use crate::schema::Table;
use crate::types::{NameFamily, StandardType, infer_standard_type, matches_family};

/// One row of table introspection output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub position: i64,
    pub name: String,
    pub declared_type: String,
    pub not_null: bool,
    pub default_value: Option<String>,
    pub is_primary_key: bool,
}

impl From<(i64, String, String, bool, Option<String>, bool)> for ColumnMetadata {
    fn from(row: (i64, String, String, bool, Option<String>, bool)) -> Self {
        let (position, name, declared_type, not_null, default_value, is_primary_key) = row;
        Self {
            position,
            name,
            declared_type,
            not_null,
            default_value,
            is_primary_key,
        }
    }
}

/// Build introspection-shaped metadata from a parsed table.
///
/// A column is treated as primary key when its definition says so or when it
/// is literally named `id`.
pub fn table_metadata(table: &Table) -> Vec<ColumnMetadata> {
    table
        .columns
        .iter()
        .enumerate()
        .map(|(position, column)| ColumnMetadata {
            position: position as i64,
            name: column.name.clone(),
            declared_type: column.declared_type.clone(),
            not_null: column.declares_not_null(),
            default_value: None,
            is_primary_key: column.declares_primary_key() || column.name.eq_ignore_ascii_case("id"),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub declared_type: String,
    pub standard_type: StandardType,
    pub is_primary_key: bool,
    pub is_foreign_key: bool,
    pub is_nullable: bool,
    pub default_value: Option<String>,
    pub constraints: Vec<ColumnConstraint>,
    /// Naming-convention guess at the referenced table; advisory only.
    pub references: Option<ReferenceGuess>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyHint {
    pub column: String,
    pub references: Option<String>,
}

/// Normalized description of one table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaInfo {
    pub columns: Vec<AnalyzedColumn>,
    pub primary_keys: Vec<String>,
    pub foreign_keys: Vec<ForeignKeyHint>,
    pub column_count: usize,
}

impl SchemaInfo {
    pub fn column(&self, name: &str) -> Option<&AnalyzedColumn> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Name of the column used to identify rows, `id` when nothing better is declared.
    pub fn primary_key(&self) -> String {
        self.primary_keys
            .first()
            .cloned()
            .unwrap_or_else(|| "id".to_string())
    }
}

/// A column is a foreign-key candidate when it is shaped like `*_id`,
/// `*Id` or `fk_*` and is not literally `id`.
pub fn is_foreign_key_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    if lower == "id" {
        return false;
    }
    lower.ends_with("_id")
        || lower.starts_with("fk_")
        || (name.ends_with("Id") && name.len() > 2 && !name[..name.len() - 2].ends_with('_'))
}

pub fn analyze_table_schema(column_metadata: &[ColumnMetadata]) -> SchemaInfo {
    let mut columns = Vec::with_capacity(column_metadata.len());
    let mut primary_keys = Vec::new();
    let mut foreign_keys = Vec::new();

    for meta in column_metadata {
        let column = analyze_column(meta);

        if column.is_primary_key {
            primary_keys.push(column.name.clone());
        }
        if column.is_foreign_key {
            foreign_keys.push(ForeignKeyHint {
                column: column.name.clone(),
                references: column
                    .references
                    .as_ref()
                    .and_then(|guess| guess.best().map(str::to_string)),
            });
        }

        columns.push(column);
    }

    debug!(
        columns = columns.len(),
        primary_keys = primary_keys.len(),
        foreign_keys = foreign_keys.len(),
        "analyzed table schema"
    );

    SchemaInfo {
        column_count: columns.len(),
        columns,
        primary_keys,
        foreign_keys,
    }
}

fn analyze_column(meta: &ColumnMetadata) -> AnalyzedColumn {
    let standard_type = infer_standard_type(&meta.declared_type, &meta.name);
    let is_foreign_key = is_foreign_key_name(&meta.name);
    let references = if is_foreign_key {
        guess_reference(&meta.name)
    } else {
        None
    };

    let mut constraints = Vec::new();
    if meta.not_null {
        constraints.push(ColumnConstraint::NotNull);
    }
    if meta.is_primary_key {
        constraints.push(ColumnConstraint::PrimaryKey);
    }
    if is_foreign_key {
        constraints.push(ColumnConstraint::ForeignKey);
    }

    AnalyzedColumn {
        name: meta.name.clone(),
        declared_type: meta.declared_type.clone(),
        standard_type,
        is_primary_key: meta.is_primary_key,
        is_foreign_key,
        is_nullable: !meta.not_null,
        default_value: meta.default_value.clone(),
        constraints,
        references,
    }
}

/// Inclusive numeric range suggested for a column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueRange {
    Integer { min: i64, max: i64 },
    Decimal { min: f64, max: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataPattern {
    Currency,
    Name,
    RecentDate,
    Boolean,
    Text,
}

impl DataPattern {
    /// Short annotation appended to column specs in prompts.
    pub fn prompt_hint(&self) -> Option<&'static str> {
        match self {
            DataPattern::Currency => Some("price"),
            DataPattern::Name => Some("name"),
            DataPattern::RecentDate => Some("date"),
            DataPattern::Boolean => Some("true/false"),
            DataPattern::Text => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipHint {
    pub column: String,
    pub references: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Advisory generation guidance derived from a [`SchemaInfo`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationHints {
    pub realistic_ranges: BTreeMap<String, ValueRange>,
    pub data_patterns: BTreeMap<String, DataPattern>,
    pub relationships: Vec<RelationshipHint>,
}

pub fn get_data_generation_hints(schema_info: &SchemaInfo) -> GenerationHints {
    let mut hints = GenerationHints::default();

    for column in &schema_info.columns {
        let name = column.name.as_str();
        match column.standard_type {
            StandardType::Integer => {
                let range = if matches_family(name, NameFamily::Identifier) {
                    ValueRange::Integer { min: 1, max: 10_000 }
                } else {
                    ValueRange::Integer { min: 1, max: 1_000 }
                };
                hints.realistic_ranges.insert(name.to_string(), range);
            }
            StandardType::Decimal => {
                if matches_family(name, NameFamily::Price) {
                    hints.realistic_ranges.insert(
                        name.to_string(),
                        ValueRange::Decimal {
                            min: 1.00,
                            max: 10_000.00,
                        },
                    );
                    hints
                        .data_patterns
                        .insert(name.to_string(), DataPattern::Currency);
                } else {
                    hints.realistic_ranges.insert(
                        name.to_string(),
                        ValueRange::Decimal {
                            min: 0.0,
                            max: 1_000.0,
                        },
                    );
                }
            }
            StandardType::String | StandardType::Text => {
                let pattern = if matches_family(name, NameFamily::Label) {
                    DataPattern::Name
                } else {
                    DataPattern::Text
                };
                hints.data_patterns.insert(name.to_string(), pattern);
            }
            StandardType::DateTime => {
                hints
                    .data_patterns
                    .insert(name.to_string(), DataPattern::RecentDate);
            }
            StandardType::Boolean => {
                hints
                    .data_patterns
                    .insert(name.to_string(), DataPattern::Boolean);
            }
            StandardType::Date | StandardType::Json => {}
        }

        if column.is_foreign_key {
            hints.relationships.push(RelationshipHint {
                column: name.to_string(),
                references: column
                    .references
                    .as_ref()
                    .and_then(|guess| guess.best().map(str::to_string)),
                kind: "foreign_key".to_string(),
            });
        }
    }

    hints
}
