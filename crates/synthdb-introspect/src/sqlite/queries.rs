use sqlx::{Row, SqlitePool};

use synthdb_core::{ColumnMetadata, Error, Result};

fn db_error(err: sqlx::Error) -> Error {
    Error::Db(err.to_string())
}

pub async fn list_tables(pool: &SqlitePool) -> Result<Vec<String>> {
    let rows = sqlx::query(
        r#"
        select name
        from sqlite_master
        where type = 'table'
          and name not like 'sqlite_%'
        order by name
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(db_error)?;

    rows.iter()
        .map(|row| row.try_get::<String, _>("name").map_err(db_error))
        .collect()
}

pub async fn list_table_sql(pool: &SqlitePool) -> Result<Vec<String>> {
    let rows = sqlx::query(
        r#"
        select sql
        from sqlite_master
        where type = 'table'
          and name not like 'sqlite_%'
          and sql is not null
        order by name
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(db_error)?;

    rows.iter()
        .map(|row| row.try_get::<String, _>("sql").map_err(db_error))
        .collect()
}

pub async fn table_info(pool: &SqlitePool, table: &str) -> Result<Vec<ColumnMetadata>> {
    let rows = sqlx::query(
        r#"
        select cid, name, type, "notnull", dflt_value, pk
        from pragma_table_info(?1)
        order by cid
        "#,
    )
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(db_error)?;

    rows.iter()
        .map(|row| {
            Ok(ColumnMetadata {
                position: row.try_get::<i64, _>("cid").map_err(db_error)?,
                name: row.try_get::<String, _>("name").map_err(db_error)?,
                declared_type: row.try_get::<String, _>("type").map_err(db_error)?,
                not_null: row.try_get::<i64, _>("notnull").map_err(db_error)? != 0,
                default_value: row
                    .try_get::<Option<String>, _>("dflt_value")
                    .map_err(db_error)?,
                is_primary_key: row.try_get::<i64, _>("pk").map_err(db_error)? > 0,
            })
        })
        .collect()
}
