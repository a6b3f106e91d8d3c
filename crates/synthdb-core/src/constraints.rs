use serde::{Deserialize, Serialize};

/// A foreign-key edge between two tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ForeignKeyRelation {
    pub source_table: String,
    pub source_column: String,
    pub target_table: String,
    /// Defaults to `id` when the DDL omits the referenced column.
    pub target_column: String,
}

impl ForeignKeyRelation {
    pub fn new(
        source_table: impl Into<String>,
        source_column: impl Into<String>,
        target_table: impl Into<String>,
        target_column: Option<String>,
    ) -> Self {
        Self {
            source_table: source_table.into(),
            source_column: source_column.into(),
            target_table: target_table.into(),
            target_column: target_column.unwrap_or_else(|| "id".to_string()),
        }
    }

    pub fn is_self_reference(&self) -> bool {
        self.source_table.eq_ignore_ascii_case(&self.target_table)
    }
}

/// Per-column constraint flags reported by the schema analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnConstraint {
    #[serde(rename = "NOT NULL")]
    NotNull,
    #[serde(rename = "PRIMARY KEY")]
    PrimaryKey,
    #[serde(rename = "FOREIGN KEY")]
    ForeignKey,
}

impl std::fmt::Display for ColumnConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ColumnConstraint::NotNull => "NOT NULL",
            ColumnConstraint::PrimaryKey => "PRIMARY KEY",
            ColumnConstraint::ForeignKey => "FOREIGN KEY",
        };
        f.write_str(label)
    }
}
