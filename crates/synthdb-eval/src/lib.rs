//! Quality metrics for generated databases.

pub mod engine;
pub mod errors;
pub mod metrics;
pub mod report;

pub use engine::{collect_generation_metrics, evaluate_run_dir, read_generated_data};
pub use errors::EvalError;
pub use metrics::{GenerationMetrics, METRICS_VERSION, ReferentialCheck, TableMetrics, WarningItem};
pub use report::{render_comparison, render_report};
