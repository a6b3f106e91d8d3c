use thiserror::Error;

/// Core error type shared across synthdb crates.
#[derive(Debug, Error)]
pub enum Error {
    /// Database error or adapter failure.
    #[error("database error: {0}")]
    Db(String),
    /// The schema contains no tables at all.
    #[error("schema contains no tables")]
    EmptySchema,
    /// The schema violates internal invariants.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    /// Catch-all error for unexpected failures.
    #[error("other error: {0}")]
    Other(String),
}

/// Convenience alias for results returned by synthdb crates.
pub type Result<T> = std::result::Result<T, Error>;
