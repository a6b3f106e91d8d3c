use std::sync::Arc;

use synthdb_core::{ParsedSchema, validate_schema};
use synthdb_plan::parse_schema;
use tracing::{info, warn};

use crate::errors::{GenerationError, Result};
use crate::llm::{CompletionRequest, LanguageModel};
use crate::prompts::{SCHEMA_SYSTEM_PROMPT, schema_prompt};
use crate::request::DatabaseRequest;

/// Model calls made before an output without tables is treated as fatal.
pub const SCHEMA_ATTEMPTS: u32 = 2;

/// Asks the model for DDL and parses it.
#[derive(Clone)]
pub struct SchemaGenerator {
    llm: Arc<dyn LanguageModel>,
}

impl SchemaGenerator {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// One model call; returns the SQL with any markdown fence removed.
    pub async fn generate_schema(&self, request: &DatabaseRequest) -> Result<String> {
        let completion = CompletionRequest::new(SCHEMA_SYSTEM_PROMPT, schema_prompt(request))
            .with_temperature(0.3)
            .with_max_tokens(2500);
        let raw = self.llm.complete(&completion).await?;
        Ok(strip_sql_fence(&raw))
    }

    /// Generate, parse and validate, asking again when the output holds no
    /// `CREATE TABLE` statements.
    pub async fn generate_parsed(&self, request: &DatabaseRequest) -> Result<(String, ParsedSchema)> {
        for attempt in 1..=SCHEMA_ATTEMPTS {
            let sql = self.generate_schema(request).await?;
            let parsed = parse_schema(&sql);
            if parsed.is_empty() {
                warn!(attempt, chars = sql.len(), "schema output contained no tables");
                continue;
            }
            validate_schema(&parsed)?;
            info!(
                event = "schema_generated",
                tables = parsed.tables.len(),
                attempt,
                "generated schema"
            );
            return Ok((sql, parsed));
        }
        Err(GenerationError::EmptySchema)
    }
}

fn strip_sql_fence(raw: &str) -> String {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    let body = rest
        .split_once('\n')
        .map(|(_, body)| body)
        .unwrap_or_default();
    body.rsplit_once("```")
        .map(|(body, _)| body)
        .unwrap_or(body)
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_sql_fences() {
        assert_eq!(
            strip_sql_fence("```sql\nCREATE TABLE a (id INTEGER);\n```"),
            "CREATE TABLE a (id INTEGER);"
        );
        assert_eq!(strip_sql_fence("  CREATE TABLE a (id INTEGER);"), "CREATE TABLE a (id INTEGER);");
        assert_eq!(strip_sql_fence("```\nCREATE TABLE a (id INTEGER);"), "CREATE TABLE a (id INTEGER);");
    }
}
