use async_trait::async_trait;

use synthdb_core::{ColumnMetadata, Result};

/// Trait implemented by database adapters that can describe their tables.
#[async_trait]
pub trait Introspector: Send + Sync {
    /// Returns the engine identifier (e.g. `sqlite`).
    fn engine(&self) -> &'static str;

    /// User table names, sorted.
    async fn table_names(&self) -> Result<Vec<String>>;

    /// Columns of `table` in declaration order.
    async fn table_info(&self, table: &str) -> Result<Vec<ColumnMetadata>>;

    /// Stored DDL for every user table, `;`-terminated.
    async fn schema_sql(&self) -> Result<String>;
}
