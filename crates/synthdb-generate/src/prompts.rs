//! Prompt text sent to the language model.

use serde_json::Value;
use synthdb_core::{GenerationHints, SchemaInfo};
use synthdb_plan::TableGenerationPlan;

use crate::request::{DatabaseRequest, truncate_chars};

pub const SCHEMA_SYSTEM_PROMPT: &str =
    "Generate SQL database schemas. Return only SQL statements.";

pub const BATCH_SYSTEM_PROMPT: &str = r#"You are a specialized data generator. Your ONLY job is to generate valid JSON arrays.

CRITICAL RULES:
1. Return ONLY a JSON array, nothing else
2. Use double quotes for all strings
3. Ensure all JSON objects are complete and properly closed
4. No trailing commas after the last object
5. No explanations, no markdown, no additional text

RESPONSE FORMAT: [{"key": "value"}, {"key": "value"}]"#;

pub const LEGACY_SYSTEM_PROMPT: &str = "You are a data generation expert. Generate realistic sample data in valid JSON format. Follow data type requirements precisely.";

/// User prompt for schema generation.
pub fn schema_prompt(request: &DatabaseRequest) -> String {
    let requirements: Vec<&str> = request
        .requirements
        .iter()
        .take(3)
        .map(String::as_str)
        .collect();
    let mut prompt = format!(
        "Generate SQL database schema for {business_type} business:\n\n\
         Business: {description}\n\
         Complexity: {complexity}\n\
         Requirements: {requirements}\n",
        business_type = request.business_type,
        description = truncate_chars(&request.description, 150),
        complexity = request.complexity,
        requirements = requirements.join(", "),
    );
    if !request.additional_context.trim().is_empty() {
        prompt.push_str(&format!(
            "Additional context: {}\n",
            request.additional_context.trim()
        ));
    }
    prompt.push_str(&format!(
        "\nCreate {count} tables with:\n\
         - Proper relationships (foreign keys)\n\
         - Realistic columns for the business\n\
         - Primary keys, constraints\n\
         - SQLite/PostgreSQL compatible\n\n\
         Return only SQL CREATE TABLE statements.",
        count = request.complexity.table_count_target(),
    ));
    prompt
}

/// `Reference Data:` block listing sampled parent ids, empty when there are none.
pub fn reference_context(references: &[(String, Vec<Value>)]) -> String {
    let lines: Vec<String> = references
        .iter()
        .filter(|(_, ids)| !ids.is_empty())
        .map(|(table, ids)| {
            let rendered: Vec<String> = ids.iter().map(Value::to_string).collect();
            format!("Available {table} IDs: [{}]", rendered.join(", "))
        })
        .collect();

    if lines.is_empty() {
        String::new()
    } else {
        format!("Reference Data:\n{}\n", lines.join("\n"))
    }
}

fn column_listing(schema_info: &SchemaInfo, hints: &GenerationHints) -> String {
    if schema_info.columns.is_empty() {
        return "  (column information not available)".to_string();
    }
    schema_info
        .columns
        .iter()
        .map(|column| {
            let hint = hints
                .data_patterns
                .get(&column.name)
                .and_then(|pattern| pattern.prompt_hint());
            match hint {
                Some(hint) => format!("  {}: {} ({hint})", column.name, column.declared_type),
                None => format!("  {}: {}", column.name, column.declared_type),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// User prompt for one table of the batch pipeline.
pub fn table_prompt(
    plan: &TableGenerationPlan,
    business_context: &str,
    reference_context: &str,
) -> String {
    let table = &plan.table_name;
    let target = plan.target_records;
    let columns = column_listing(&plan.schema_info, &plan.generation_hints);

    format!(
        r#"Generate realistic sample data for the '{table}' table.

Business Context: {business_context}
Domain Context: {domain}

Table Schema:
{columns}

{reference_context}
CRITICAL REQUIREMENTS:
1. Generate EXACTLY {target} records
2. Return ONLY a valid JSON array - no explanations, no markdown, no additional text
3. Each record must be a complete JSON object with all required fields
4. Use realistic data appropriate for: {business_context}
5. Ensure ALL strings are properly quoted with double quotes
6. Do NOT use single quotes, use double quotes only
7. End every record with a comma except the last one
8. Make sure the JSON is properly terminated
9. Foreign key columns must only use the IDs listed under Reference Data

FORMAT EXAMPLE:
[
  {{"id": 1, "name": "John Doe", "email": "john@example.com"}},
  {{"id": 2, "name": "Jane Smith", "email": "jane@example.com"}}
]

IMPORTANT:
- Start with [ and end with ]
- Every string must use double quotes "like this"
- No trailing commas after the last object
- Each object must be complete and valid JSON

Generate {target} records for {table} table following the exact format above:"#,
        domain = plan.domain_context,
    )
}

/// Compact `table(col:TYPE(hint), ...)` spec, at most `max_columns` columns.
pub fn legacy_table_spec(
    table: &str,
    schema_info: &SchemaInfo,
    hints: &GenerationHints,
    max_columns: usize,
) -> String {
    let columns: Vec<String> = schema_info
        .columns
        .iter()
        .take(max_columns)
        .map(|column| {
            let hint = hints
                .data_patterns
                .get(&column.name)
                .and_then(|pattern| pattern.prompt_hint());
            match hint {
                Some(hint) => format!("{}:{}({hint})", column.name, column.declared_type),
                None => format!("{}:{}", column.name, column.declared_type),
            }
        })
        .collect();
    format!("{table}({})", columns.join(", "))
}

/// User prompt for the single-call path.
pub fn legacy_prompt(request: &DatabaseRequest, table_specs: &[String]) -> String {
    let record_count = request.sample_size.legacy_range();
    format!(
        r#"Generate {record_count} realistic records per table for {business_type} business: "{description}..."

Tables: {tables}

CRITICAL: Return ONLY valid JSON, no explanation:
{{"table1": [{{"col1": "val1", "col2": "val2"}}], "table2": [...]}}

Data Type Rules:
- IDs: sequential integers (1,2,3...)
- Prices: decimal numbers (e.g., 29.99)
- Dates: "YYYY-MM-DD" format
- Booleans: true/false (not "true"/"false")
- Names: realistic text appropriate for business
- Foreign keys: reference existing IDs from related tables

Generate exactly {record_count} records per table with proper data types."#,
        business_type = request.business_type,
        description = truncate_chars(&request.description, 100),
        tables = table_specs.join(" | "),
    )
}
