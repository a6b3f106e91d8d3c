use serde::{Deserialize, Serialize};

/// Pipeline stages of the batch generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStage {
    Analyzing,
    MappingDependencies,
    GeneratingData,
    Validating,
    Retrying,
    Completed,
    Failed,
}

impl GenerationStage {
    /// Progress value reported on entering the stage.
    pub fn entry_percent(&self) -> f64 {
        match self {
            GenerationStage::Analyzing => 5.0,
            GenerationStage::MappingDependencies => 15.0,
            GenerationStage::GeneratingData => 20.0,
            GenerationStage::Validating => 85.0,
            GenerationStage::Retrying => 90.0,
            GenerationStage::Completed => 100.0,
            GenerationStage::Failed => -1.0,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            GenerationStage::Analyzing => "Analyzing schema and planning generation...",
            GenerationStage::MappingDependencies => "Resolving table dependencies...",
            GenerationStage::GeneratingData => "Generating table data sequentially...",
            GenerationStage::Validating => "Validating generation results...",
            GenerationStage::Retrying => "Retrying failed tables...",
            GenerationStage::Completed => "Batch generation completed successfully!",
            GenerationStage::Failed => "Batch generation failed",
        }
    }
}

/// Receives `(message, percent)` updates. A negative percent carries an
/// error message instead of progress.
///
/// Called inline from the generation loop, so implementations should be cheap.
pub trait ProgressCallback: Send + Sync {
    fn report(&self, message: &str, percent: f64);
}

impl<F> ProgressCallback for F
where
    F: Fn(&str, f64) + Send + Sync,
{
    fn report(&self, message: &str, percent: f64) {
        self(message, percent)
    }
}

/// Callback that discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn report(&self, _message: &str, _percent: f64) {}
}

/// Maps a child pipeline's 0-100 progress into `[start, end]` of a parent.
pub struct ProgressAdapter<'a> {
    inner: &'a dyn ProgressCallback,
    start: f64,
    end: f64,
}

impl<'a> ProgressAdapter<'a> {
    pub fn new(inner: &'a dyn ProgressCallback, start: f64, end: f64) -> Self {
        Self { inner, start, end }
    }

    pub fn map(&self, percent: f64) -> f64 {
        if percent < 0.0 {
            return percent;
        }
        self.start + (percent / 100.0) * (self.end - self.start)
    }
}

impl ProgressCallback for ProgressAdapter<'_> {
    fn report(&self, message: &str, percent: f64) {
        self.inner.report(message, self.map(percent));
    }
}

/// Per-run progress state. The reported percentage never decreases except
/// for the failure sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationProgress {
    pub stage: GenerationStage,
    pub percent: f64,
    pub message: String,
    pub total_tables: usize,
    /// Table being generated or retried right now.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_table: Option<String>,
    pub completed_tables: Vec<String>,
    pub failed_tables: Vec<String>,
}

impl GenerationProgress {
    pub fn new(total_tables: usize) -> Self {
        Self {
            stage: GenerationStage::Analyzing,
            percent: 0.0,
            message: String::new(),
            total_tables,
            current_table: None,
            completed_tables: Vec::new(),
            failed_tables: Vec::new(),
        }
    }

    /// Enter `stage` and notify `callback`.
    pub fn enter(&mut self, stage: GenerationStage, callback: &dyn ProgressCallback) {
        self.stage = stage;
        self.message = stage.message().to_string();
        self.percent = match stage {
            GenerationStage::Failed => stage.entry_percent(),
            _ => self.percent.max(stage.entry_percent()),
        };
        callback.report(&self.message, self.percent);
    }

    /// Report progress for table `index` of `len` within `[start, end]`.
    pub fn table_started(
        &mut self,
        table: &str,
        index: usize,
        len: usize,
        band: (f64, f64),
        callback: &dyn ProgressCallback,
    ) {
        let (start, end) = band;
        let fraction = if len == 0 { 0.0 } else { index as f64 / len as f64 };
        self.percent = self.percent.max(start + fraction * (end - start));
        self.current_table = Some(table.to_string());
        self.message = format!("Generating {table}...");
        callback.report(&self.message, self.percent);
    }

    /// A retry pass picked up `table`; the percentage does not move.
    pub fn table_retried(&mut self, table: &str) {
        self.current_table = Some(table.to_string());
    }

    pub fn clear_current_table(&mut self) {
        self.current_table = None;
    }

    pub fn mark_completed(&mut self, table: &str) {
        self.failed_tables.retain(|name| name != table);
        if !self.completed_tables.iter().any(|name| name == table) {
            self.completed_tables.push(table.to_string());
        }
    }

    pub fn mark_failed(&mut self, table: &str) {
        self.completed_tables.retain(|name| name != table);
        if !self.failed_tables.iter().any(|name| name == table) {
            self.failed_tables.push(table.to_string());
        }
    }
}
