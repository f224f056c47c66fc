//! `SQLite` store backed by sqlx.

use std::path::Path;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::migrate::Migrator;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row as _, SqlitePool, TypeInfo, ValueRef};

use sanskara_core::db::{PoolError, StoreLocation, open_migrated};
use sanskara_core::protocol::encode_base64;

use super::named::to_positional;
use super::store::{Params, Row, Store, StoreError};

static WEDDING_SCHEMA: Migrator = sqlx::migrate!("./migrations");

/// Wedding store in a local `SQLite` file.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn open(path: &Path) -> Result<Self, PoolError> {
        let pool = open_migrated(StoreLocation::File(path), &WEDDING_SCHEMA).await?;
        Ok(Self { pool })
    }

    pub async fn open_in_memory() -> Result<Self, PoolError> {
        let pool = open_migrated(StoreLocation::Memory, &WEDDING_SCHEMA).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn execute(&self, query: &str, params: &Params) -> Result<Vec<Row>, StoreError> {
        let (sql, values) = to_positional(query, params)?;

        let mut q = sqlx::query(&sql);
        for value in values {
            q = match value {
                Value::Null => q.bind(None::<String>),
                Value::Bool(b) => q.bind(b),
                Value::Number(n) => match n.as_i64() {
                    Some(i) => q.bind(i),
                    None => q.bind(n.as_f64()),
                },
                Value::String(s) => q.bind(s),
                other => q.bind(other.to_string()),
            };
        }

        let rows = q.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_json).collect()
    }
}

/// Convert a row by each value's storage class.
fn row_to_json(row: &SqliteRow) -> Result<Row, StoreError> {
    let mut out = Map::with_capacity(row.len());
    for (i, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(i)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            let kind = raw.type_info().name().to_string();
            match kind.as_str() {
                "INTEGER" | "BOOLEAN" => Value::from(row.try_get::<i64, _>(i)?),
                "REAL" | "NUMERIC" => Value::from(row.try_get::<f64, _>(i)?),
                "BLOB" => Value::String(encode_base64(&row.try_get::<Vec<u8>, _>(i)?)),
                _ => Value::String(row.try_get::<String, _>(i)?),
            }
        };
        out.insert(column.name().to_string(), value);
    }
    Ok(out)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::storage::store::params;

    #[tokio::test]
    async fn migrations_create_the_wedding_schema() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let rows = store
            .execute(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = :name",
                &params([("name", json!("wedding_members"))]),
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn rows_come_back_as_typed_json() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let rows = store
            .execute(
                "SELECT :i AS i, :f AS f, :s AS s, :n AS n, :b AS b",
                &params([
                    ("i", json!(42)),
                    ("f", json!(1.5)),
                    ("s", json!("text")),
                    ("n", Value::Null),
                    ("b", json!(true)),
                ]),
            )
            .await
            .unwrap();
        let row = &rows[0];
        assert_eq!(row["i"], json!(42));
        assert_eq!(row["f"], json!(1.5));
        assert_eq!(row["s"], json!("text"));
        assert_eq!(row["n"], Value::Null);
        assert_eq!(row["b"], json!(1));
    }

    #[tokio::test]
    async fn bad_sql_is_a_database_error() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let err = store
            .execute("SELEC nonsense", &Params::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Database(_)));
    }

    #[tokio::test]
    async fn file_store_keeps_rows_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sanskara.db");

        let store = SqliteStore::open(&path).await.unwrap();
        store
            .execute(
                "INSERT INTO users (user_id, display_name) VALUES ('u1', 'Asha')",
                &Params::new(),
            )
            .await
            .unwrap();
        store.pool.close().await;

        let reopened = SqliteStore::open(&path).await.unwrap();
        let rows = reopened
            .execute("SELECT display_name FROM users", &Params::new())
            .await
            .unwrap();
        assert_eq!(rows[0]["display_name"], json!("Asha"));
    }
}
