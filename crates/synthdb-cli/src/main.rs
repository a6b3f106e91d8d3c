mod registry;
mod workspace;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use synthdb_core::{
    Error as CoreError, GenerationHints, SchemaInfo, analyze_table_schema,
    get_data_generation_hints,
};
use synthdb_eval::{
    EvalError, collect_generation_metrics, evaluate_run_dir, render_comparison, render_report,
};
use synthdb_generate::{
    BusinessType, Complexity, DatabaseGenerator, DatabaseRequest, GeneratedDatabase,
    GenerationError, LlmError, LruSchemaCache, OpenAiClient, SampleSize, SchemaGenerator,
};
use synthdb_introspect::{IntrospectOptions, SqliteIntrospector, snapshot};
use synthdb_plan::{Resolution, parse_schema, resolve_dependencies};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use registry::{RunContext, RunOptions, RunPaths, init_logging, start_run};
use workspace::{DEFAULT_SETTINGS_FILE, SynthSettings, load_or_create_settings};

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error("workspace error: {0}")]
    Workspace(#[from] workspace::WorkspaceError),
    #[error("core error: {0}")]
    Core(#[from] CoreError),
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),
    #[error("language model error: {0}")]
    Llm(#[from] LlmError),
    #[error("evaluation error: {0}")]
    Eval(#[from] EvalError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Parser, Debug)]
#[command(name = "synthdb", version, about = "Synthetic database generator")]
struct Cli {
    /// Settings file, created with defaults when missing.
    #[arg(long, global = true, default_value = DEFAULT_SETTINGS_FILE)]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print CREATE TABLE statements for a business description.
    Schema(RequestArgs),
    /// Generate a schema and sample data into a new run directory.
    Generate(GenerateArgs),
    /// Print the generation order and dependency map of a SQL file.
    Resolve(ResolveArgs),
    /// Analyze the tables of an existing SQLite database.
    Analyze(AnalyzeArgs),
    /// Run both generation methods and compare populated-table rates.
    Compare(CompareArgs),
    /// Recompute metrics for an existing run directory.
    Evaluate(EvaluateArgs),
}

#[derive(Args, Debug)]
struct RequestArgs {
    /// One of ecommerce, healthcare, finance, education, manufacturing,
    /// retail, technology, hospitality, logistics, consulting, custom.
    #[arg(long)]
    business_type: BusinessType,
    /// simple, medium, complex or enterprise.
    #[arg(long, default_value = "medium")]
    complexity: Complexity,
    /// Free-text description of the business.
    #[arg(long)]
    description: String,
    /// Extra requirement; repeat for more.
    #[arg(long = "requirement", value_name = "TEXT")]
    requirements: Vec<String>,
    /// Additional context appended to the schema prompt.
    #[arg(long, default_value = "")]
    context: String,
    /// Provider API key; overrides the settings file.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

impl RequestArgs {
    fn to_request(&self) -> DatabaseRequest {
        let mut request =
            DatabaseRequest::new(self.business_type, self.complexity, self.description.clone());
        request.requirements = self.requirements.clone();
        request.additional_context = self.context.clone();
        request
    }
}

#[derive(Args, Debug)]
struct DataArgs {
    /// small, medium or large; defaults to the settings file.
    #[arg(long)]
    sample_size: Option<SampleSize>,
    /// Records per table, overriding the sample size tier.
    #[arg(long)]
    records: Option<usize>,
}

impl DataArgs {
    fn apply(&self, request: &mut DatabaseRequest, settings: &SynthSettings) -> Result<(), CliError> {
        if self.records == Some(0) {
            return Err(CliError::InvalidConfig("--records must be positive".to_string()));
        }
        request.sample_size = self.sample_size.unwrap_or(settings.sample_size);
        request.target_records = self.records;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Method {
    Robust,
    Legacy,
    Fallback,
}

impl Method {
    fn as_str(&self) -> &'static str {
        match self {
            Method::Robust => "robust",
            Method::Legacy => "legacy",
            Method::Fallback => "fallback",
        }
    }
}

#[derive(Args, Debug)]
struct GenerateArgs {
    #[command(flatten)]
    request: RequestArgs,
    #[command(flatten)]
    data: DataArgs,
    /// Generation method; fallback runs robust then legacy on error.
    #[arg(long, value_enum, default_value_t = Method::Fallback)]
    method: Method,
    /// Output directory for runs; defaults to the settings file.
    #[arg(long)]
    run_dir: Option<PathBuf>,
    /// Generate the schema only.
    #[arg(long, default_value_t = false)]
    schema_only: bool,
}

#[derive(Args, Debug)]
struct ResolveArgs {
    /// SQL file with CREATE TABLE statements.
    schema: PathBuf,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// SQLite file path or sqlite:// URL.
    database: String,
}

#[derive(Args, Debug)]
struct CompareArgs {
    #[command(flatten)]
    request: RequestArgs,
    #[command(flatten)]
    data: DataArgs,
    /// Print a markdown table instead of JSON.
    #[arg(long, default_value_t = false)]
    markdown: bool,
}

#[derive(Args, Debug)]
struct EvaluateArgs {
    /// Run directory containing schema.sql and data.json.
    run: PathBuf,
    /// Records per table; defaults to the run's config.json.
    #[arg(long)]
    records: Option<usize>,
    /// Row-count tolerance; defaults to the settings file.
    #[arg(long)]
    threshold: Option<f64>,
}

#[derive(Debug, Serialize)]
struct AnalyzedTable {
    name: String,
    schema_info: SchemaInfo,
    generation_hints: GenerationHints,
}

#[derive(Debug, Serialize)]
struct Analysis {
    engine: String,
    resolution: Resolution,
    tables: Vec<AnalyzedTable>,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Schema(args) => run_schema(&cli.config, args).await,
        Command::Generate(args) => run_generate(&cli.config, args).await,
        Command::Resolve(args) => run_resolve(args),
        Command::Analyze(args) => run_analyze(args).await,
        Command::Compare(args) => run_compare(&cli.config, args).await,
        Command::Evaluate(args) => run_evaluate(&cli.config, args),
    }
}

fn load_settings(config: &Path, api_key: Option<String>) -> Result<SynthSettings, CliError> {
    Ok(load_or_create_settings(config)?.with_api_key(api_key))
}

fn database_generator(settings: &SynthSettings) -> Result<DatabaseGenerator, CliError> {
    let llm = OpenAiClient::new(&settings.llm)?;
    Ok(DatabaseGenerator::new(
        Arc::new(llm),
        settings.generator.clone(),
        Arc::new(LruSchemaCache::from_settings(&settings.cache)),
    ))
}

fn print_progress(message: &str, percent: f64) {
    if percent < 0.0 {
        eprintln!("[ failed ] {message}");
    } else {
        eprintln!("[{percent:>6.1}%] {message}");
    }
}

async fn run_schema(config: &Path, args: RequestArgs) -> Result<(), CliError> {
    init_logging(None)?;
    let settings = load_settings(config, args.api_key.clone())?;
    let llm = OpenAiClient::new(&settings.llm)?;

    let (schema_sql, schema) = SchemaGenerator::new(Arc::new(llm))
        .generate_parsed(&args.to_request())
        .await?;

    info!(tables = schema.tables.len(), "schema generated");
    println!("{schema_sql}");
    Ok(())
}

async fn run_generate(config: &Path, args: GenerateArgs) -> Result<(), CliError> {
    let settings = load_settings(config, args.request.api_key.clone())?;
    let mut request = args.request.to_request();
    args.data.apply(&mut request, &settings)?;
    request.include_sample_data = !args.schema_only;

    let generator = database_generator(&settings)?;

    let run_ctx = RunContext {
        run_id: Uuid::new_v4().to_string(),
        started_at: chrono::Utc::now(),
        run_dir: args.run_dir.unwrap_or_else(|| settings.run_dir.clone()),
        options: RunOptions {
            method: args.method.as_str().to_string(),
            target_records: request.target_records(),
            request: request.clone(),
            model: settings.llm.model.clone(),
            base_url: settings.llm.base_url.clone(),
            generator: settings.generator.clone(),
        },
    };
    let paths = start_run(&run_ctx)?;
    init_logging(Some(&paths.logs_path))?;

    info!(
        event = "run_started",
        run_id = %run_ctx.run_id,
        method = args.method.as_str(),
        business_type = %request.business_type,
        "run started"
    );
    let timer = Instant::now();

    let result = match args.method {
        Method::Robust => generator.generate_database_robust(&request, &print_progress).await,
        Method::Legacy => generator.generate_database_legacy(&request, &print_progress).await,
        Method::Fallback => {
            generator
                .generate_database_with_fallback(&request, &print_progress)
                .await
        }
    };
    let database = match result {
        Ok(database) => database,
        Err(err) => {
            info!(event = "run_finished", status = "failed", error = %err, "run failed");
            return Err(err.into());
        }
    };

    write_artifacts(
        &paths,
        &run_ctx.run_id,
        &database,
        request.target_records(),
        settings.generator.validation_threshold,
    )?;

    info!(
        event = "run_finished",
        status = "success",
        method = ?database.metadata.generation_method,
        tables = database.metadata.tables_count,
        populated = database.metadata.populated_tables_count,
        duration_ms = timer.elapsed().as_millis() as u64,
        "run finished"
    );
    println!("run directory: {}", paths.root.display());
    Ok(())
}

fn write_artifacts(
    paths: &RunPaths,
    run_id: &str,
    database: &GeneratedDatabase,
    target_records: usize,
    threshold: f64,
) -> Result<(), CliError> {
    paths.write_schema(&database.schema_sql, &database.schema)?;
    info!(event = "schema_written", path = %paths.schema_sql_path.display());

    if let Some(report) = &database.report {
        paths.write_report(report)?;
    }

    let Some(data) = &database.sample_data else {
        return Ok(());
    };
    let bytes = paths.write_data(&database.schema, data)?;
    info!(event = "data_written", bytes, path = %paths.data_dir.display());

    let mut metrics = collect_generation_metrics(
        &database.schema,
        &database.schema_sql,
        data,
        target_records,
        threshold,
    );
    metrics.run_id = Some(run_id.to_string());
    paths.write_metrics(&metrics)?;
    info!(event = "metrics_written", path = %paths.metrics_path.display());

    println!("{}", render_report(&metrics));
    Ok(())
}

fn run_resolve(args: ResolveArgs) -> Result<(), CliError> {
    init_logging(None)?;
    let sql = std::fs::read_to_string(&args.schema)?;
    let schema = parse_schema(&sql);
    if schema.is_empty() {
        return Err(CoreError::EmptySchema.into());
    }

    let resolution = resolve_dependencies(&sql, &schema.table_names());
    println!("{}", serde_json::to_string_pretty(&resolution)?);
    Ok(())
}

async fn run_analyze(args: AnalyzeArgs) -> Result<(), CliError> {
    init_logging(None)?;
    let introspector = SqliteIntrospector::connect(&sqlite_url(&args.database)).await?;
    let snapshot = snapshot(&introspector, &IntrospectOptions::default()).await?;

    let names: Vec<String> = snapshot.tables.iter().map(|t| t.name.clone()).collect();
    let tables = snapshot
        .tables
        .iter()
        .map(|table| {
            let schema_info = analyze_table_schema(&table.columns);
            AnalyzedTable {
                name: table.name.clone(),
                generation_hints: get_data_generation_hints(&schema_info),
                schema_info,
            }
        })
        .collect();

    let analysis = Analysis {
        resolution: resolve_dependencies(&snapshot.schema_sql, &names),
        engine: snapshot.engine,
        tables,
    };
    println!("{}", serde_json::to_string_pretty(&analysis)?);
    Ok(())
}

async fn run_compare(config: &Path, args: CompareArgs) -> Result<(), CliError> {
    init_logging(None)?;
    let settings = load_settings(config, args.request.api_key.clone())?;
    let mut request = args.request.to_request();
    args.data.apply(&mut request, &settings)?;

    let comparison = database_generator(&settings)?
        .compare_generation_methods(&request)
        .await;

    if args.markdown {
        println!("{}", render_comparison(&comparison));
    } else {
        println!("{}", serde_json::to_string_pretty(&comparison)?);
    }
    Ok(())
}

fn run_evaluate(config: &Path, args: EvaluateArgs) -> Result<(), CliError> {
    init_logging(None)?;
    let settings = load_settings(config, None)?;
    let target_records = args
        .records
        .or_else(|| recorded_target(&args.run))
        .unwrap_or_else(|| settings.sample_size.target_records());
    let threshold = args
        .threshold
        .unwrap_or(settings.generator.validation_threshold);
    if !(0.0..=1.0).contains(&threshold) {
        return Err(CliError::InvalidConfig(format!(
            "threshold must be within 0..=1, got {threshold}"
        )));
    }

    let metrics = evaluate_run_dir(&args.run, target_records, threshold)?;
    println!("{}", render_report(&metrics));
    Ok(())
}

/// `options.target_records` from a run's `config.json`.
fn recorded_target(run: &Path) -> Option<usize> {
    let contents = std::fs::read_to_string(run.join("config.json")).ok()?;
    let config: serde_json::Value = serde_json::from_str(&contents).ok()?;
    config["options"]["target_records"]
        .as_u64()
        .and_then(|value| usize::try_from(value).ok())
}

fn sqlite_url(database: &str) -> String {
    if database.starts_with("sqlite:") {
        database.to_string()
    } else {
        format!("sqlite://{database}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_generate_command() {
        let cli = Cli::try_parse_from([
            "synthdb",
            "generate",
            "--business-type",
            "healthcare",
            "--description",
            "Small clinic",
            "--requirement",
            "Track appointments",
            "--requirement",
            "Bill insurers",
            "--sample-size",
            "small",
            "--method",
            "robust",
        ])
        .unwrap();

        let Command::Generate(args) = cli.command else {
            panic!("expected generate command");
        };
        assert_eq!(args.method, Method::Robust);
        assert_eq!(args.data.sample_size, Some(SampleSize::Small));

        let mut request = args.request.to_request();
        args.data.apply(&mut request, &SynthSettings::default()).unwrap();
        assert_eq!(request.business_type, BusinessType::Healthcare);
        assert_eq!(request.complexity, Complexity::Medium);
        assert_eq!(request.requirements.len(), 2);
        assert_eq!(request.target_records(), 30);
        assert_eq!(cli.config, PathBuf::from(DEFAULT_SETTINGS_FILE));
    }

    #[test]
    fn rejects_unknown_business_type() {
        let result = Cli::try_parse_from([
            "synthdb",
            "schema",
            "--business-type",
            "spaceport",
            "--description",
            "x",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn records_override_and_zero_is_rejected() {
        let mut request = DatabaseRequest::new(BusinessType::Retail, Complexity::Simple, "Shop");
        let data = DataArgs {
            sample_size: None,
            records: Some(12),
        };
        data.apply(&mut request, &SynthSettings::default()).unwrap();
        assert_eq!(request.target_records(), 12);

        let zero = DataArgs {
            sample_size: None,
            records: Some(0),
        };
        assert!(matches!(
            zero.apply(&mut request, &SynthSettings::default()),
            Err(CliError::InvalidConfig(_))
        ));
    }

    #[test]
    fn sqlite_url_accepts_paths_and_urls() {
        assert_eq!(sqlite_url("shop.db"), "sqlite://shop.db");
        assert_eq!(sqlite_url("sqlite::memory:"), "sqlite::memory:");
    }

    #[test]
    fn recorded_target_reads_run_config() {
        let dir = std::env::temp_dir().join(format!("synthdb-eval-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        assert_eq!(recorded_target(&dir), None);

        std::fs::write(dir.join("config.json"), r#"{"options": {"target_records": 42}}"#).unwrap();
        assert_eq!(recorded_target(&dir), Some(42));
        std::fs::remove_dir_all(dir).ok();
    }
}
