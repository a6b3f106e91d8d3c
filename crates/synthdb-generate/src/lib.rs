//! LLM-driven sample data generation for synthdb.
//!
//! The [`BatchGenerator`] produces one table per model call in dependency
//! order, recovers records from malformed replies, validates row counts and
//! retries tables that fell short. [`DatabaseGenerator`] adds schema
//! generation, a schema cache and the single-call legacy path.

pub mod cache;
pub mod coerce;
pub mod engine;
pub mod errors;
pub mod legacy;
pub mod llm;
pub mod model;
pub mod orchestrator;
pub mod output;
pub mod progress;
pub mod prompts;
pub mod recovery;
pub mod request;
pub mod schema_gen;

pub use cache::{CachedSchema, LruSchemaCache, SchemaCache, cache_key};
pub use coerce::{CoercionPolicy, FieldValue, coerce_record, coerce_value};
pub use engine::{BatchGenerator, BatchOutcome};
pub use errors::{GenerationError, Result};
pub use legacy::{LegacyGenerator, LegacyOutcome};
pub use llm::{CompletionRequest, LanguageModel, LlmError, OpenAiClient};
pub use model::{
    CacheSettings, GeneratedData, GenerationReport, GeneratorSettings, LlmSettings, Record,
    TableReport,
};
pub use orchestrator::{
    DatabaseGenerator, GeneratedDatabase, GenerationMetadata, GenerationMethod, MethodComparison,
    MethodOutcome,
};
pub use progress::{
    GenerationProgress, GenerationStage, NoProgress, ProgressAdapter, ProgressCallback,
};
pub use recovery::{Recovered, RecoveryStrategy, recover_records};
pub use request::{BusinessType, Complexity, DatabaseRequest, SampleSize};
pub use schema_gen::SchemaGenerator;
