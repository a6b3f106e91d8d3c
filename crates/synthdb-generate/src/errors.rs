use thiserror::Error;

use crate::llm::LlmError;

/// Errors that cross the generation pipeline boundary.
///
/// Per-table and per-parse failures never surface here; they are logged and
/// recorded in the run report instead.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("schema contains no tables")]
    EmptySchema,
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    #[error("language model error: {0}")]
    Llm(#[from] LlmError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("robust generation failed ({robust}) and legacy fallback failed ({legacy})")]
    Fallback { robust: String, legacy: String },
}

impl From<synthdb_core::Error> for GenerationError {
    fn from(err: synthdb_core::Error) -> Self {
        match err {
            synthdb_core::Error::EmptySchema => GenerationError::EmptySchema,
            other => GenerationError::InvalidSchema(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, GenerationError>;
