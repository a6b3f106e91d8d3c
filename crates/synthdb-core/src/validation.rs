use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::schema::ParsedSchema;

/// Validate internal consistency of a parsed schema.
///
/// This checks:
/// - the schema has at least one table
/// - table names are unique (case-insensitive)
/// - column names are unique within a table (case-insensitive)
pub fn validate_schema(schema: &ParsedSchema) -> Result<()> {
    if schema.tables.is_empty() {
        return Err(Error::EmptySchema);
    }

    let mut tables = BTreeSet::new();
    for table in &schema.tables {
        if table.name.trim().is_empty() {
            return Err(Error::InvalidSchema("table with empty name".to_string()));
        }
        if !tables.insert(table.name.to_lowercase()) {
            return Err(Error::InvalidSchema(format!(
                "duplicate table name: {}",
                table.name
            )));
        }

        let mut columns = BTreeSet::new();
        for column in &table.columns {
            if !columns.insert(column.name.to_lowercase()) {
                return Err(Error::InvalidSchema(format!(
                    "duplicate column name: {}.{}",
                    table.name, column.name
                )));
            }
        }
    }

    Ok(())
}
