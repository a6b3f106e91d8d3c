use serde::{Deserialize, Serialize};
use synthdb_core::{Column, ColumnMetadata, ParsedSchema, Result, Table};
use tracing::debug;

use crate::adapter::Introspector;
use crate::options::IntrospectOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub name: String,
    pub columns: Vec<ColumnMetadata>,
}

/// Column metadata of every selected table plus the stored DDL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSnapshot {
    pub engine: String,
    pub tables: Vec<TableSnapshot>,
    pub schema_sql: String,
}

impl DatabaseSnapshot {
    /// Re-express the snapshot as a parsed schema for the planner.
    pub fn to_parsed_schema(&self) -> ParsedSchema {
        let tables = self
            .tables
            .iter()
            .map(|table| Table {
                name: table.name.clone(),
                columns: table.columns.iter().map(column_from_metadata).collect(),
                sql: String::new(),
            })
            .collect();

        ParsedSchema {
            raw_sql: self.schema_sql.clone(),
            tables,
        }
    }
}

fn column_from_metadata(meta: &ColumnMetadata) -> Column {
    let mut definition = format!("{} {}", meta.name, meta.declared_type);
    if meta.not_null {
        definition.push_str(" NOT NULL");
    }
    if meta.is_primary_key {
        definition.push_str(" PRIMARY KEY");
    }

    let mut column = Column::new(meta.name.clone(), meta.declared_type.clone());
    column.definition = Some(definition);
    column
}

/// Introspect every table the options select.
pub async fn snapshot<I>(introspector: &I, opts: &IntrospectOptions) -> Result<DatabaseSnapshot>
where
    I: Introspector + ?Sized,
{
    let mut tables = Vec::new();
    for name in introspector.table_names().await? {
        if !opts.includes(&name) {
            continue;
        }
        let columns = introspector.table_info(&name).await?;
        if opts.skip_empty_tables && columns.is_empty() {
            continue;
        }
        tables.push(TableSnapshot { name, columns });
    }

    debug!(
        engine = introspector.engine(),
        tables = tables.len(),
        "introspected database"
    );

    Ok(DatabaseSnapshot {
        engine: introspector.engine().to_string(),
        tables,
        schema_sql: introspector.schema_sql().await?,
    })
}
