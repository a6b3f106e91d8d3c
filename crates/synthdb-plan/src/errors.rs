use thiserror::Error;

/// Failures of the structured SQL tier. Callers fall back to regex extraction.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("tokenizer error: {0}")]
    Tokenize(String),
    #[error("no table name after CREATE TABLE")]
    MissingTableName,
    #[error("unexpected token in {context}: {found}")]
    Unexpected { context: &'static str, found: String },
}

/// Result type for planning operations.
pub type Result<T> = std::result::Result<T, PlanError>;
