use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Structured view of LLM-authored DDL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ParsedSchema {
    /// The SQL text the tables were parsed from.
    #[serde(default)]
    pub raw_sql: String,
    pub tables: Vec<Table>,
}

impl ParsedSchema {
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|table| table.name == name)
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.iter().map(|table| table.name.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// A table parsed from a `CREATE TABLE` block. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    /// Reconstructed `CREATE TABLE` statement for this table.
    #[serde(default)]
    pub sql: String,
}

/// A column as authored in the DDL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Column {
    pub name: String,
    /// Declared SQL type, verbatim.
    #[serde(rename = "type")]
    pub declared_type: String,
    /// Full column definition line, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            definition: None,
        }
    }

    /// True when the definition line declares this column a primary key.
    pub fn declares_primary_key(&self) -> bool {
        self.definition
            .as_deref()
            .map(|line| line.to_uppercase().contains("PRIMARY KEY"))
            .unwrap_or(false)
    }

    /// True when the definition line carries `NOT NULL`.
    pub fn declares_not_null(&self) -> bool {
        self.definition
            .as_deref()
            .map(|line| line.to_uppercase().contains("NOT NULL"))
            .unwrap_or(false)
    }
}
