use std::fs::{OpenOptions, create_dir_all};
use std::path::PathBuf;
use std::process::Command;

use chrono::{DateTime, Utc};
use serde::Serialize;
use synthdb_core::ParsedSchema;
use synthdb_eval::GenerationMetrics;
use synthdb_generate::output::csv::write_table_csv;
use synthdb_generate::output::json::write_generated_json;
use synthdb_generate::{DatabaseRequest, GeneratedData, GenerationReport, GeneratorSettings};
use tracing::info;

use super::RegistryResult;
use crate::workspace::{write_bytes_atomic, write_json_atomic};

/// Serializable knobs of a generate run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOptions {
    pub method: String,
    pub request: DatabaseRequest,
    pub target_records: usize,
    pub model: String,
    pub base_url: String,
    pub generator: GeneratorSettings,
}

/// Metadata captured at run start.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub run_dir: PathBuf,
    pub options: RunOptions,
}

/// JSON config written to each run directory.
#[derive(Debug, Serialize)]
struct RunConfig<'a> {
    run_id: &'a str,
    started_at: String,
    cli_version: &'static str,
    options: &'a RunOptions,
    git: GitInfo,
}

/// Git metadata for reproducibility.
#[derive(Debug, Serialize)]
struct GitInfo {
    commit: Option<String>,
    dirty: Option<bool>,
}

/// Paths for run artifacts.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub root: PathBuf,
    pub config_path: PathBuf,
    pub logs_path: PathBuf,
    pub schema_sql_path: PathBuf,
    pub schema_json_path: PathBuf,
    pub data_json_path: PathBuf,
    pub data_dir: PathBuf,
    pub report_path: PathBuf,
    pub metrics_path: PathBuf,
}

impl RunPaths {
    fn new(root: PathBuf) -> Self {
        Self {
            config_path: root.join("config.json"),
            logs_path: root.join("logs.ndjson"),
            schema_sql_path: root.join("schema.sql"),
            schema_json_path: root.join("schema.json"),
            data_json_path: root.join("data.json"),
            data_dir: root.join("data"),
            report_path: root.join("generation_report.json"),
            metrics_path: root.join("metrics.json"),
            root,
        }
    }

    pub fn table_csv_path(&self, table: &str) -> PathBuf {
        self.data_dir.join(format!("{table}.csv"))
    }

    pub fn write_schema(&self, schema_sql: &str, schema: &ParsedSchema) -> RegistryResult<()> {
        write_bytes_atomic(&self.schema_sql_path, schema_sql.as_bytes())?;
        write_json_atomic(&self.schema_json_path, schema)?;
        Ok(())
    }

    /// `data.json` plus one CSV per schema table, including empty ones.
    pub fn write_data(&self, schema: &ParsedSchema, data: &GeneratedData) -> RegistryResult<u64> {
        let json_bytes = write_generated_json(&self.data_json_path, data)?;
        create_dir_all(&self.data_dir)?;

        let mut csv_bytes = 0u64;
        for table in &schema.tables {
            let records = data.get(&table.name).map(Vec::as_slice).unwrap_or_default();
            let path = self.table_csv_path(&table.name);
            csv_bytes += write_table_csv(&path, table, records)?;
            info!(
                event = "table_written",
                table = %table.name,
                rows = records.len(),
                path = %path.display()
            );
        }

        Ok(json_bytes + csv_bytes)
    }

    pub fn write_report(&self, report: &GenerationReport) -> RegistryResult<()> {
        write_json_atomic(&self.report_path, report)?;
        Ok(())
    }

    pub fn write_metrics(&self, metrics: &GenerationMetrics) -> RegistryResult<()> {
        write_json_atomic(&self.metrics_path, metrics)?;
        Ok(())
    }
}

/// Create `<run_dir>/<timestamp>__run_<id>/` with its config and log file.
pub fn start_run(ctx: &RunContext) -> RegistryResult<RunPaths> {
    let timestamp = ctx.started_at.format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let paths = RunPaths::new(ctx.run_dir.join(format!("{timestamp}__run_{}", ctx.run_id)));

    create_dir_all(&paths.root)?;

    let config = RunConfig {
        run_id: &ctx.run_id,
        started_at: ctx.started_at.to_rfc3339(),
        cli_version: env!("CARGO_PKG_VERSION"),
        options: &ctx.options,
        git: collect_git_info(),
    };
    write_json_atomic(&paths.config_path, &config)?;

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&paths.logs_path)?;

    Ok(paths)
}

fn collect_git_info() -> GitInfo {
    let commit = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
        .filter(|value| !value.is_empty());

    let dirty = Command::new("git")
        .args(["status", "--porcelain"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| !output.stdout.is_empty());

    GitInfo { commit, dirty }
}
