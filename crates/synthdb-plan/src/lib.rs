//! Generation planning for synthdb.
//!
//! Turns model-authored DDL into a parsed schema, extracts foreign keys with
//! a tokenizer tier and a regex tier, resolves a safe generation order, and
//! builds one [`TableGenerationPlan`] per table.

pub mod ddl;
pub mod errors;
pub mod model;
pub mod resolver;
pub mod sql;

pub use ddl::parse_schema;
pub use errors::{PlanError, Result};
pub use model::{TableGenerationPlan, UNRANKED, apply_resolution, build_plans, domain_context};
pub use resolver::{Resolution, resolve_dependencies};
pub use sql::{
    CreateTableKeys, extract_foreign_keys, regex_foreign_keys, split_statements,
    tokenized_foreign_keys,
};
