use std::str::FromStr;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Column, ConnectOptions, Connection, Executor, Row, TypeInfo, ValueRef};

use crate::error::ExecutorError;
use crate::model::Id;
use crate::store::executor::{
    connection_error, query_error, DatabaseExecutor, ExecutorConnector, QueryRows,
};

/// Gives every project its own private in-memory SQLite database
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteConnector;

#[async_trait]
impl ExecutorConnector for SqliteConnector {
    async fn connect(&self, _project_id: &Id) -> Result<Box<dyn DatabaseExecutor>, ExecutorError> {
        Ok(Box::new(SqliteExecutor::open().await?))
    }
}

#[derive(Debug)]
pub struct SqliteExecutor {
    conn: Option<SqliteConnection>,
}

impl SqliteExecutor {
    pub async fn open() -> Result<Self, ExecutorError> {
        Ok(Self {
            conn: Some(fresh_connection().await?),
        })
    }
}

/// `sqlite::memory:` yields a uniquely named database on every parse, and the
/// database is freed once its only connection closes.
async fn fresh_connection() -> Result<SqliteConnection, ExecutorError> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(connection_error)?;
    options.connect().await.map_err(connection_error)
}

#[async_trait]
impl DatabaseExecutor for SqliteExecutor {
    async fn execute(&mut self, sql: &str) -> Result<QueryRows, ExecutorError> {
        let conn = self.conn.as_mut().ok_or(ExecutorError::Closed)?;
        let rows = conn.fetch_all(sql).await.map_err(query_error)?;
        rows.iter().map(row_to_json).collect()
    }

    async fn reset(&mut self) -> Result<(), ExecutorError> {
        if let Some(conn) = self.conn.take() {
            conn.close().await.map_err(connection_error)?;
        }
        self.conn = Some(fresh_connection().await?);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ExecutorError> {
        if let Some(conn) = self.conn.take() {
            conn.close().await.map_err(connection_error)?;
        }
        Ok(())
    }
}

fn row_to_json(row: &SqliteRow) -> Result<Value, ExecutorError> {
    let mut object = Map::new();
    for column in row.columns() {
        let index = column.ordinal();
        let raw = row.try_get_raw(index).map_err(query_error)?;

        let value = if raw.is_null() {
            Value::Null
        } else {
            // The value's storage class, not the declared column type
            let type_name = raw.type_info().name().to_ascii_uppercase();
            match type_name.as_str() {
                "INTEGER" | "BIGINT" | "INT8" | "BOOLEAN" => {
                    Value::from(row.try_get_unchecked::<i64, _>(index).map_err(query_error)?)
                }
                "REAL" | "FLOAT" | "DOUBLE" => {
                    Value::from(row.try_get_unchecked::<f64, _>(index).map_err(query_error)?)
                }
                "BLOB" => {
                    let bytes = row.try_get_unchecked::<Vec<u8>, _>(index).map_err(query_error)?;
                    Value::from(format!("\\x{}", hex::encode(bytes)))
                }
                _ => Value::from(row.try_get_unchecked::<String, _>(index).map_err(query_error)?),
            }
        };
        object.insert(column.name().to_string(), value);
    }
    Ok(Value::Object(object))
}
