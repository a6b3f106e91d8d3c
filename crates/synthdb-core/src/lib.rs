//! Core contracts and helpers for synthdb.
//!
//! This crate defines the parsed schema model, the standard type taxonomy,
//! the schema analyzer, and the table dependency graph shared by the
//! planner, the generators, and the CLI.

pub mod analyzer;
pub mod constraints;
pub mod error;
pub mod graph;
pub mod inflection;
pub mod schema;
pub mod types;
pub mod validation;

pub use analyzer::{
    AnalyzedColumn, ColumnMetadata, DataPattern, ForeignKeyHint, GenerationHints, RelationshipHint,
    SchemaInfo, ValueRange, analyze_table_schema, get_data_generation_hints, is_foreign_key_name,
    table_metadata,
};
pub use constraints::{ColumnConstraint, ForeignKeyRelation};
pub use error::{Error, Result};
pub use graph::{DependencyGraph, GenerationOrder, GraphSummary};
pub use inflection::{Confidence, ReferenceGuess, guess_reference, pluralize, singularize};
pub use schema::{Column, ParsedSchema, Table};
pub use types::{StandardType, infer_standard_type, normalize_sql_type};
pub use validation::validate_schema;
