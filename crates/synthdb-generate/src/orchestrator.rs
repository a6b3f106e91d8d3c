use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use synthdb_core::ParsedSchema;
use tracing::{error, info, warn};

use crate::cache::{CachedSchema, LruSchemaCache, SchemaCache, cache_key};
use crate::engine::BatchGenerator;
use crate::errors::{GenerationError, Result};
use crate::legacy::LegacyGenerator;
use crate::llm::LanguageModel;
use crate::model::{GeneratedData, GenerationReport, GeneratorSettings};
use crate::progress::{NoProgress, ProgressAdapter, ProgressCallback};
use crate::request::{BusinessType, Complexity, DatabaseRequest};
use crate::schema_gen::SchemaGenerator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMethod {
    RobustBatch,
    LegacyBatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationMetadata {
    pub business_type: BusinessType,
    pub complexity: Complexity,
    pub tables_count: usize,
    pub populated_tables_count: usize,
    pub used_cache: bool,
    pub generation_method: GenerationMethod,
    pub generated_at: DateTime<Utc>,
}

/// A generated schema plus its sample data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedDatabase {
    pub schema: ParsedSchema,
    pub schema_sql: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_data: Option<GeneratedData>,
    /// Batch report, robust method only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<GenerationReport>,
    pub metadata: GenerationMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodOutcome {
    pub success: bool,
    pub populated_tables: usize,
    pub total_tables: usize,
    pub success_rate: f64,
    pub error: Option<String>,
}

impl MethodOutcome {
    fn from_result(result: &Result<GeneratedDatabase>) -> Self {
        match result {
            Ok(database) => {
                let total = database.metadata.tables_count;
                let populated = database.metadata.populated_tables_count;
                Self {
                    success: true,
                    populated_tables: populated,
                    total_tables: total,
                    success_rate: if total > 0 {
                        populated as f64 / total as f64
                    } else {
                        0.0
                    },
                    error: None,
                }
            }
            Err(err) => Self {
                success: false,
                populated_tables: 0,
                total_tables: 0,
                success_rate: 0.0,
                error: Some(err.to_string()),
            },
        }
    }
}

/// Side-by-side population rates of both methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodComparison {
    pub legacy: MethodOutcome,
    pub robust: MethodOutcome,
    pub improvement: f64,
    pub improvement_percentage: f64,
    pub robust_better: bool,
}

impl MethodComparison {
    pub fn new(legacy: MethodOutcome, robust: MethodOutcome) -> Self {
        let improvement = robust.success_rate - legacy.success_rate;
        let improvement_percentage = if legacy.success_rate > 0.0 {
            improvement / legacy.success_rate * 100.0
        } else {
            0.0
        };
        Self {
            robust_better: robust.success_rate > legacy.success_rate,
            legacy,
            robust,
            improvement,
            improvement_percentage,
        }
    }
}

fn populated(data: Option<&GeneratedData>) -> usize {
    data.map(|data| data.values().filter(|rows| !rows.is_empty()).count())
        .unwrap_or(0)
}

struct SchemaStage {
    schema_sql: String,
    schema: ParsedSchema,
    used_cache: bool,
}

/// Schema + data generation with a schema cache in front of the model.
pub struct DatabaseGenerator {
    schema_generator: SchemaGenerator,
    batch: BatchGenerator,
    legacy: LegacyGenerator,
    cache: Arc<dyn SchemaCache>,
}

impl DatabaseGenerator {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        settings: GeneratorSettings,
        cache: Arc<dyn SchemaCache>,
    ) -> Self {
        Self {
            schema_generator: SchemaGenerator::new(llm.clone()),
            batch: BatchGenerator::new(llm.clone(), settings),
            legacy: LegacyGenerator::new(llm),
            cache,
        }
    }

    pub fn with_defaults(llm: Arc<dyn LanguageModel>) -> Self {
        Self::new(
            llm,
            GeneratorSettings::default(),
            Arc::new(LruSchemaCache::default()),
        )
    }

    pub fn cache(&self) -> &dyn SchemaCache {
        self.cache.as_ref()
    }

    async fn schema_stage(
        &self,
        request: &DatabaseRequest,
        callback: &dyn ProgressCallback,
        (generating, parsing, done): (f64, Option<f64>, f64),
    ) -> Result<SchemaStage> {
        let key = cache_key(request);
        if let Some(cached) = self.cache.get(&key) {
            info!(
                key = %key,
                tables = cached.parsed.tables.len(),
                "using cached schema"
            );
            callback.report("Retrieved cached schema", done);
            return Ok(SchemaStage {
                schema_sql: cached.schema_sql,
                schema: cached.parsed,
                used_cache: true,
            });
        }

        callback.report("Generating database schema...", generating);
        let (schema_sql, schema) = self.schema_generator.generate_parsed(request).await?;
        if let Some(parsing) = parsing {
            callback.report("Parsing schema...", parsing);
        }
        self.cache.insert(
            key,
            CachedSchema {
                schema_sql: schema_sql.clone(),
                parsed: schema.clone(),
            },
        );
        callback.report("Schema generation complete", done);

        Ok(SchemaStage {
            schema_sql,
            schema,
            used_cache: false,
        })
    }

    /// Schema (cached when possible) plus per-table batch generation.
    pub async fn generate_database_robust(
        &self,
        request: &DatabaseRequest,
        callback: &dyn ProgressCallback,
    ) -> Result<GeneratedDatabase> {
        let result = self.run_robust(request, callback).await;
        report_failure(&result, callback, "robust");
        result
    }

    async fn run_robust(
        &self,
        request: &DatabaseRequest,
        callback: &dyn ProgressCallback,
    ) -> Result<GeneratedDatabase> {
        info!(
            business_type = %request.business_type,
            complexity = %request.complexity,
            "starting robust database generation"
        );
        callback.report("Initializing robust generation...", 5.0);

        let stage = self.schema_stage(request, callback, (10.0, None, 15.0)).await?;

        let mut sample_data = None;
        let mut report = None;
        if request.include_sample_data {
            callback.report("Starting robust data generation...", 20.0);
            let adapter = ProgressAdapter::new(callback, 20.0, 90.0);
            let outcome = self
                .batch
                .generate_all_tables(
                    &stage.schema,
                    &stage.schema_sql,
                    &request.business_context(),
                    request.target_records(),
                    &adapter,
                )
                .await?;

            for table in &stage.schema.tables {
                match outcome.data.get(&table.name).map(Vec::len).unwrap_or(0) {
                    0 => warn!(table = %table.name, "no data generated"),
                    records => info!(table = %table.name, records, "table populated"),
                }
            }
            callback.report("Robust data generation complete", 90.0);
            sample_data = Some(outcome.data);
            report = Some(outcome.report);
        } else {
            info!("skipping sample data generation");
        }

        callback.report("Database generation completed!", 100.0);
        Ok(self.assemble(request, stage, sample_data, report, GenerationMethod::RobustBatch))
    }

    /// Schema (cached when possible) plus one model call for all tables.
    pub async fn generate_database_legacy(
        &self,
        request: &DatabaseRequest,
        callback: &dyn ProgressCallback,
    ) -> Result<GeneratedDatabase> {
        let result = self.run_legacy(request, callback).await;
        report_failure(&result, callback, "legacy");
        result
    }

    async fn run_legacy(
        &self,
        request: &DatabaseRequest,
        callback: &dyn ProgressCallback,
    ) -> Result<GeneratedDatabase> {
        info!(
            business_type = %request.business_type,
            complexity = %request.complexity,
            "starting single-call database generation"
        );
        callback.report("Initializing generation...", 10.0);

        let stage = self
            .schema_stage(request, callback, (20.0, Some(40.0), 50.0))
            .await?;

        let mut sample_data = None;
        if request.include_sample_data {
            callback.report("Generating sample data...", 70.0);
            let outcome = self
                .legacy
                .generate_sample_data_legacy(&stage.schema, request)
                .await;
            if outcome.used_fallback {
                warn!("single-call generation used fallback rows");
            }
            callback.report("Sample data generation complete", 90.0);
            sample_data = Some(outcome.data);
        }

        callback.report("Database generation completed!", 100.0);
        Ok(self.assemble(request, stage, sample_data, None, GenerationMethod::LegacyBatch))
    }

    /// Robust generation, falling back to the single-call method on error.
    pub async fn generate_database_with_fallback(
        &self,
        request: &DatabaseRequest,
        callback: &dyn ProgressCallback,
    ) -> Result<GeneratedDatabase> {
        let robust_err = match self.generate_database_robust(request, callback).await {
            Ok(database) => return Ok(database),
            Err(err) => err,
        };

        warn!(error = %robust_err, "robust generation failed, falling back to single-call method");
        callback.report("Falling back to original generation method...", 10.0);

        self.generate_database_legacy(request, callback)
            .await
            .map_err(|legacy_err| GenerationError::Fallback {
                robust: robust_err.to_string(),
                legacy: legacy_err.to_string(),
            })
    }

    /// Run both methods and compare their populated-table ratios.
    pub async fn compare_generation_methods(&self, request: &DatabaseRequest) -> MethodComparison {
        info!("testing single-call generation method");
        let legacy = MethodOutcome::from_result(&self.generate_database_legacy(request, &NoProgress).await);

        info!("testing robust generation method");
        let robust = MethodOutcome::from_result(&self.generate_database_robust(request, &NoProgress).await);

        let comparison = MethodComparison::new(legacy, robust);
        info!(
            legacy_rate = comparison.legacy.success_rate,
            robust_rate = comparison.robust.success_rate,
            robust_better = comparison.robust_better,
            "compared generation methods"
        );
        comparison
    }

    fn assemble(
        &self,
        request: &DatabaseRequest,
        stage: SchemaStage,
        sample_data: Option<GeneratedData>,
        report: Option<GenerationReport>,
        generation_method: GenerationMethod,
    ) -> GeneratedDatabase {
        let metadata = GenerationMetadata {
            business_type: request.business_type,
            complexity: request.complexity,
            tables_count: stage.schema.tables.len(),
            populated_tables_count: populated(sample_data.as_ref()),
            used_cache: stage.used_cache,
            generation_method,
            generated_at: Utc::now(),
        };
        GeneratedDatabase {
            schema: stage.schema,
            schema_sql: stage.schema_sql,
            sample_data,
            report,
            metadata,
        }
    }
}

fn report_failure(result: &Result<GeneratedDatabase>, callback: &dyn ProgressCallback, method: &str) {
    if let Err(err) = result {
        callback.report(&format!("Error: {err}"), -1.0);
        error!(method, error = %err, "database generation failed");
    }
}
