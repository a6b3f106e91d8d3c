use serde::{Deserialize, Serialize};

/// Metrics contract version.
pub const METRICS_VERSION: &str = "0.1";

/// Machine-readable quality metrics for one generated database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationMetrics {
    pub metrics_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    pub target_records: usize,
    pub threshold: f64,
    pub total_tables: usize,
    pub populated_tables: usize,
    /// Populated tables over schema tables, 0 for an empty schema.
    pub population_ratio: f64,
    pub total_records: usize,
    pub tables: Vec<TableMetrics>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub referential: Vec<ReferentialCheck>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<WarningItem>,
}

impl GenerationMetrics {
    pub fn tables_meeting_threshold(&self) -> usize {
        self.tables.iter().filter(|t| t.meets_threshold).count()
    }
}

/// Per-table row counts and tolerance verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMetrics {
    pub table: String,
    pub generation_order: usize,
    pub rows_found: usize,
    pub rows_expected: usize,
    pub meets_threshold: bool,
    /// Declared columns absent from every record.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_columns: Vec<String>,
}

/// How many child foreign-key values point at a generated parent row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferentialCheck {
    pub table: String,
    pub column: String,
    pub target_table: String,
    pub target_column: String,
    pub checked: usize,
    pub matched: usize,
    pub ratio: f64,
}

/// Structured warning entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarningItem {
    pub code: String,
    pub path: String,
    pub message: String,
}
