use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use synthdb_core::{ColumnMetadata, Error, Result};

use crate::adapter::Introspector;

mod queries;

/// Adapter for SQLite databases.
#[derive(Debug, Clone)]
pub struct SqliteIntrospector {
    pool: SqlitePool,
}

impl SqliteIntrospector {
    /// Create a new adapter using a pre-configured pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a read-only single-connection pool for `url`
    /// (`sqlite://path/to.db` or `sqlite::memory:`).
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|err| Error::Db(err.to_string()))?
            .read_only(!url.contains(":memory:"));
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|err| Error::Db(err.to_string()))?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl Introspector for SqliteIntrospector {
    fn engine(&self) -> &'static str {
        "sqlite"
    }

    async fn table_names(&self) -> Result<Vec<String>> {
        queries::list_tables(&self.pool).await
    }

    async fn table_info(&self, table: &str) -> Result<Vec<ColumnMetadata>> {
        queries::table_info(&self.pool, table).await
    }

    async fn schema_sql(&self) -> Result<String> {
        let statements = queries::list_table_sql(&self.pool).await?;
        Ok(statements
            .into_iter()
            .map(|sql| format!("{};", sql.trim().trim_end_matches(';')))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
