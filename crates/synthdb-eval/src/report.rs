use synthdb_generate::{MethodComparison, MethodOutcome};

use crate::metrics::GenerationMetrics;

/// Render a deterministic markdown report from generation metrics.
pub fn render_report(metrics: &GenerationMetrics) -> String {
    let mut lines = Vec::new();

    lines.push("# Synthdb Generation Report".to_string());
    lines.push(String::new());
    lines.push("## Run summary".to_string());
    if let Some(run_id) = &metrics.run_id {
        lines.push(format!("- run_id: {run_id}"));
    }
    lines.push(format!(
        "- populated tables: {}/{} ({:.0}%)",
        metrics.populated_tables,
        metrics.total_tables,
        metrics.population_ratio * 100.0
    ));
    lines.push(format!("- total records: {}", metrics.total_records));
    lines.push(format!(
        "- target: {} rows per table, threshold {}",
        metrics.target_records, metrics.threshold
    ));
    lines.push(String::new());

    lines.push("## Row counts".to_string());
    lines.push("| order | table | rows_found | rows_expected | status |".to_string());
    lines.push("| --- | --- | --- | --- | --- |".to_string());
    for table in &metrics.tables {
        let status = if table.meets_threshold { "ok" } else { "short" };
        lines.push(format!(
            "| {} | {} | {} | {} | {} |",
            table.generation_order, table.table, table.rows_found, table.rows_expected, status
        ));
    }
    lines.push(String::new());

    if !metrics.referential.is_empty() {
        lines.push("## Referential plausibility".to_string());
        lines.push("| reference | checked | matched | ratio |".to_string());
        lines.push("| --- | --- | --- | --- |".to_string());
        for check in &metrics.referential {
            lines.push(format!(
                "| {}.{} -> {}.{} | {} | {} | {:.2} |",
                check.table,
                check.column,
                check.target_table,
                check.target_column,
                check.checked,
                check.matched,
                check.ratio
            ));
        }
        lines.push(String::new());
    }

    if !metrics.warnings.is_empty() {
        lines.push("## Warnings".to_string());
        for warning in &metrics.warnings {
            lines.push(format!("- {} [{}]: {}", warning.path, warning.code, warning.message));
        }
        lines.push(String::new());
    }

    lines.push("## Recommendations".to_string());
    lines.extend(recommendations(metrics));
    lines.join("\n")
}

fn recommendations(metrics: &GenerationMetrics) -> Vec<String> {
    let mut lines = Vec::new();
    if metrics.tables_meeting_threshold() < metrics.tables.len() {
        lines.push("- rerun short tables or lower the requested record count.".to_string());
    }
    if metrics.referential.iter().any(|check| check.matched < check.checked) {
        lines.push("- raise the reference sample size so children see more parent ids.".to_string());
    }
    if metrics.tables.iter().any(|table| !table.missing_columns.is_empty()) {
        lines.push("- review prompts for tables with missing columns.".to_string());
    }
    if lines.is_empty() {
        lines.push("- no issues detected; compare metrics across runs for drift.".to_string());
    }
    lines
}

/// Markdown table comparing both generation methods.
pub fn render_comparison(comparison: &MethodComparison) -> String {
    let mut lines = vec![
        "# Generation Method Comparison".to_string(),
        String::new(),
        "| method | success | populated | total | rate | error |".to_string(),
        "| --- | --- | --- | --- | --- | --- |".to_string(),
        comparison_row("legacy", &comparison.legacy),
        comparison_row("robust", &comparison.robust),
        String::new(),
        format!(
            "- improvement: {:+.2} ({:+.1}%)",
            comparison.improvement, comparison.improvement_percentage
        ),
    ];
    lines.push(format!(
        "- better method: {}",
        if comparison.robust_better { "robust" } else { "legacy" }
    ));
    lines.join("\n")
}

fn comparison_row(name: &str, outcome: &MethodOutcome) -> String {
    format!(
        "| {} | {} | {} | {} | {:.2} | {} |",
        name,
        outcome.success,
        outcome.populated_tables,
        outcome.total_tables,
        outcome.success_rate,
        outcome.error.as_deref().unwrap_or("-")
    )
}
