//! Database introspection adapters.
//!
//! Adapters report columns in the `(position, name, declared_type, not_null,
//! default, is_primary_key)` shape the schema analyzer consumes.

pub mod adapter;
pub mod options;
pub mod snapshot;
pub mod sqlite;

pub use adapter::Introspector;
pub use options::IntrospectOptions;
pub use snapshot::{DatabaseSnapshot, TableSnapshot, snapshot};
pub use sqlite::SqliteIntrospector;

pub use synthdb_core::ColumnMetadata;
