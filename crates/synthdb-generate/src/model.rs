use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::recovery::RecoveryStrategy;

/// One generated row, keyed by column name.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Generated rows per table.
pub type GeneratedData = BTreeMap<String, Vec<Record>>;

/// Tuning knobs for the batch generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    /// Fraction of the target a table must reach to count as generated.
    pub validation_threshold: f64,
    /// Extra passes over tables that missed the threshold.
    pub retry_passes: u32,
    /// Parent ids shown to child tables per dependency.
    pub reference_sample_size: usize,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
    /// Progress band spanned by the per-table loop.
    pub progress_start: f64,
    pub progress_end: f64,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            validation_threshold: 0.8,
            retry_passes: 1,
            reference_sample_size: 10,
            temperature: 0.3,
            max_tokens: 4000,
            top_p: 0.8,
            frequency_penalty: 0.1,
            presence_penalty: 0.1,
            progress_start: 20.0,
            progress_end: 80.0,
        }
    }
}

/// Language-model provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            timeout_secs: 120,
        }
    }
}

/// Schema cache sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub capacity: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl_secs: Option<u64>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: 64,
            ttl_secs: None,
        }
    }
}

/// Outcome of one table across all attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableReport {
    pub table: String,
    pub generation_order: usize,
    pub rows_requested: usize,
    pub rows_generated: usize,
    pub attempts: u32,
    /// Recovery strategy that produced the kept records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<RecoveryStrategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Report for a batch generation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub run_id: String,
    pub generation_order: Vec<String>,
    pub tables: Vec<TableReport>,
    pub completed_tables: Vec<String>,
    pub failed_tables: Vec<String>,
    pub retries_total: u32,
    pub llm_calls: u32,
    pub llm_failures: u32,
    pub strategy_usage: BTreeMap<String, u64>,
}

impl GenerationReport {
    pub fn new(run_id: String) -> Self {
        Self {
            run_id,
            ..Self::default()
        }
    }

    pub fn record_strategy(&mut self, strategy: RecoveryStrategy) {
        *self
            .strategy_usage
            .entry(strategy.as_str().to_string())
            .or_insert(0) += 1;
    }

    pub fn record_llm_call(&mut self, ok: bool) {
        self.llm_calls += 1;
        if !ok {
            self.llm_failures += 1;
        }
    }

    pub fn table_mut(&mut self, table: &str) -> Option<&mut TableReport> {
        self.tables.iter_mut().find(|report| report.table == table)
    }

    pub fn populated_tables(&self) -> usize {
        self.tables
            .iter()
            .filter(|report| report.rows_generated > 0)
            .count()
    }
}
