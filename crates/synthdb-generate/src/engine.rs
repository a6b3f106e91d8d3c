use std::sync::Arc;

use serde_json::Value;
use synthdb_core::ParsedSchema;
use synthdb_plan::{TableGenerationPlan, apply_resolution, build_plans, resolve_dependencies};
use tracing::{debug, error, info, warn};

use crate::coerce::{CoercionPolicy, coerce_records};
use crate::errors::{GenerationError, Result};
use crate::llm::{CompletionRequest, LanguageModel, LlmError};
use crate::model::{GeneratedData, GenerationReport, GeneratorSettings, Record, TableReport};
use crate::progress::{GenerationProgress, GenerationStage, ProgressCallback};
use crate::prompts::{BATCH_SYSTEM_PROMPT, reference_context, table_prompt};
use crate::recovery::{RecoveryStrategy, preview, recover_records};

/// Result of a batch generation run.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub data: GeneratedData,
    pub report: GenerationReport,
    pub progress: GenerationProgress,
}

/// Generates every table of a schema one model call at a time, parents
/// before children, then retries tables that fell short.
#[derive(Clone)]
pub struct BatchGenerator {
    llm: Arc<dyn LanguageModel>,
    settings: GeneratorSettings,
}

struct TableAttempt {
    records: Vec<Record>,
    strategy: Option<RecoveryStrategy>,
    error: Option<LlmError>,
}

/// Mutable state owned by one call to `generate_all_tables`.
struct BatchRun<'a> {
    settings: &'a GeneratorSettings,
    callback: &'a dyn ProgressCallback,
    plans: Vec<TableGenerationPlan>,
    data: GeneratedData,
    report: GenerationReport,
    progress: GenerationProgress,
    last_llm_error: Option<LlmError>,
}

impl BatchGenerator {
    pub fn new(llm: Arc<dyn LanguageModel>, settings: GeneratorSettings) -> Self {
        Self { llm, settings }
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    /// Run the full pipeline for `schema`.
    ///
    /// Tables that cannot be generated are reported as failed; the call
    /// only errors for an empty schema or when no model call succeeds.
    pub async fn generate_all_tables(
        &self,
        schema: &ParsedSchema,
        schema_sql: &str,
        business_context: &str,
        target_records_per_table: usize,
        callback: &dyn ProgressCallback,
    ) -> Result<BatchOutcome> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let mut run = BatchRun {
            settings: &self.settings,
            callback,
            plans: Vec::new(),
            data: GeneratedData::new(),
            report: GenerationReport::new(run_id.clone()),
            progress: GenerationProgress::new(schema.tables.len()),
            last_llm_error: None,
        };

        if schema.is_empty() {
            error!(run_id = %run_id, "schema contains no tables");
            run.progress.enter(GenerationStage::Failed, callback);
            return Err(GenerationError::EmptySchema);
        }

        info!(
            event = "run_started",
            run_id = %run_id,
            tables = schema.tables.len(),
            target_records = target_records_per_table,
            "batch generation started"
        );

        run.progress.enter(GenerationStage::Analyzing, callback);
        run.plans = build_plans(schema, business_context, target_records_per_table);

        run.progress.enter(GenerationStage::MappingDependencies, callback);
        let resolution = resolve_dependencies(schema_sql, &schema.table_names());
        apply_resolution(&mut run.plans, &resolution);
        run.report.generation_order = run.plans.iter().map(|p| p.table_name.clone()).collect();
        run.report.tables = run
            .plans
            .iter()
            .map(|plan| TableReport {
                table: plan.table_name.clone(),
                generation_order: plan.generation_order,
                rows_requested: plan.target_records,
                rows_generated: 0,
                attempts: 0,
                strategy: None,
                error: None,
            })
            .collect();

        run.progress.enter(GenerationStage::GeneratingData, callback);
        let band = (self.settings.progress_start, self.settings.progress_end);
        let total = run.plans.len();
        for index in 0..total {
            let table = run.plans[index].table_name.clone();
            run.progress.table_started(&table, index, total, band, callback);
            let attempt = self.generate_table(&run, index, business_context).await;
            run.store(index, attempt, false);
        }
        run.progress.clear_current_table();

        run.progress.enter(GenerationStage::Validating, callback);
        let mut failed = run.validate();

        for pass in 0..self.settings.retry_passes {
            if failed.is_empty() {
                break;
            }
            run.progress.enter(GenerationStage::Retrying, callback);
            info!(pass = pass + 1, tables = ?failed, "retrying failed tables");
            for table in &failed {
                let Some(index) = run.plans.iter().position(|p| &p.table_name == table) else {
                    continue;
                };
                run.report.retries_total += 1;
                run.progress.table_retried(table);
                let attempt = self.generate_table(&run, index, business_context).await;
                run.store(index, attempt, true);
            }
            run.progress.clear_current_table();
            run.progress.enter(GenerationStage::Validating, callback);
            failed = run.validate();
        }

        if run.report.llm_calls > 0 && run.report.llm_failures == run.report.llm_calls {
            run.progress.enter(GenerationStage::Failed, callback);
            let err = run
                .last_llm_error
                .take()
                .unwrap_or_else(|| LlmError::Other("every model call failed".to_string()));
            error!(run_id = %run_id, error = %err, "no model call succeeded");
            return Err(GenerationError::Llm(err));
        }

        run.progress.enter(GenerationStage::Completed, callback);
        info!(
            event = "run_finished",
            run_id = %run_id,
            completed = run.report.completed_tables.len(),
            failed = run.report.failed_tables.len(),
            "batch generation finished"
        );

        Ok(BatchOutcome {
            data: run.data,
            report: run.report,
            progress: run.progress,
        })
    }

    async fn generate_table(
        &self,
        run: &BatchRun<'_>,
        index: usize,
        business_context: &str,
    ) -> TableAttempt {
        let plan = &run.plans[index];
        let references = run.reference_ids(plan);
        let prompt = table_prompt(plan, business_context, &reference_context(&references));
        let request = CompletionRequest {
            system: BATCH_SYSTEM_PROMPT.to_string(),
            prompt,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            top_p: Some(self.settings.top_p),
            frequency_penalty: Some(self.settings.frequency_penalty),
            presence_penalty: Some(self.settings.presence_penalty),
        };

        let content = match self.llm.complete(&request).await {
            Ok(content) => content,
            Err(err) => {
                error!(table = %plan.table_name, error = %err, "model call failed");
                return TableAttempt {
                    records: Vec::new(),
                    strategy: None,
                    error: Some(err),
                };
            }
        };

        let Some(recovered) = recover_records(&content) else {
            error!(
                table = %plan.table_name,
                chars = content.len(),
                preview = preview(content.trim(), 300),
                "all parsing strategies failed"
            );
            return TableAttempt {
                records: Vec::new(),
                strategy: None,
                error: None,
            };
        };

        let records = coerce_records(recovered.records, &plan.schema_info, CoercionPolicy::KeepMissing);
        if (records.len() as f64) < plan.target_records as f64 * 0.5 {
            warn!(
                table = %plan.table_name,
                records = records.len(),
                target = plan.target_records,
                "low record count"
            );
        }
        debug!(
            table = %plan.table_name,
            strategy = recovered.strategy.as_str(),
            records = records.len(),
            "parsed table response"
        );

        TableAttempt {
            records,
            strategy: Some(recovered.strategy),
            error: None,
        }
    }
}

impl BatchRun<'_> {
    /// Sampled identifier values of every already generated dependency.
    fn reference_ids(&self, plan: &TableGenerationPlan) -> Vec<(String, Vec<Value>)> {
        plan.dependencies
            .iter()
            .filter_map(|dependency| {
                let records = self.data.get(dependency).filter(|rows| !rows.is_empty())?;
                let key = self
                    .plans
                    .iter()
                    .find(|p| &p.table_name == dependency)
                    .map(|p| p.schema_info.primary_key())
                    .unwrap_or_else(|| "id".to_string());
                let ids: Vec<Value> = records
                    .iter()
                    .filter_map(|record| record.get(&key))
                    .filter(|value| !value.is_null())
                    .take(self.settings.reference_sample_size)
                    .cloned()
                    .collect();
                Some((dependency.clone(), ids))
            })
            .collect()
    }

    fn store(&mut self, index: usize, attempt: TableAttempt, is_retry: bool) {
        let table = self.plans[index].table_name.clone();
        self.report.record_llm_call(attempt.error.is_none());
        if let Some(strategy) = attempt.strategy {
            self.report.record_strategy(strategy);
        }

        let previous = self.data.get(&table).map(Vec::len).unwrap_or(0);
        let keep = if is_retry {
            attempt.records.len() > previous
        } else {
            true
        };

        if let Some(report) = self.report.table_mut(&table) {
            report.attempts += 1;
            report.error = attempt.error.as_ref().map(ToString::to_string);
            if keep {
                report.rows_generated = attempt.records.len();
                report.strategy = attempt.strategy;
            }
        }

        if keep {
            if attempt.records.is_empty() {
                self.progress.mark_failed(&table);
            } else {
                info!(
                    event = "table_generated",
                    table = %table,
                    records = attempt.records.len(),
                    retry = is_retry,
                    "generated table"
                );
                self.progress.mark_completed(&table);
            }
            self.data.insert(table, attempt.records);
        }

        if let Some(err) = attempt.error {
            self.last_llm_error = Some(err);
        }
    }

    /// Tables below the threshold, in generation order.
    fn validate(&mut self) -> Vec<String> {
        let threshold = self.settings.validation_threshold;
        let mut completed = Vec::new();
        let mut failed = Vec::new();

        for plan in &self.plans {
            let generated = self.data.get(&plan.table_name).map(Vec::len).unwrap_or(0);
            if plan.meets_threshold(generated, threshold) {
                completed.push(plan.table_name.clone());
            } else {
                warn!(
                    table = %plan.table_name,
                    generated,
                    required = plan.required_records(threshold),
                    "table below record threshold"
                );
                failed.push(plan.table_name.clone());
            }
        }

        self.progress.completed_tables = completed.clone();
        self.progress.failed_tables = failed.clone();
        self.report.completed_tables = completed;
        self.report.failed_tables = failed.clone();
        failed
    }
}
