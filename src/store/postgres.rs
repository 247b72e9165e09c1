use std::str::FromStr;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow};
use sqlx::{Column, ConnectOptions, Connection, Executor, Row, TypeInfo, ValueRef};

use crate::error::ExecutorError;
use crate::model::Id;
use crate::store::executor::{
    connection_error, query_error, DatabaseExecutor, ExecutorConnector, QueryRows,
};

/// Places every project in its own schema on a shared Postgres server
#[derive(Debug, Clone)]
pub struct PostgresConnector {
    options: PgConnectOptions,
}

impl PostgresConnector {
    pub fn new(database_url: &str) -> Result<Self, ExecutorError> {
        let options = PgConnectOptions::from_str(database_url).map_err(connection_error)?;
        Ok(Self { options })
    }
}

#[async_trait]
impl ExecutorConnector for PostgresConnector {
    async fn connect(&self, project_id: &Id) -> Result<Box<dyn DatabaseExecutor>, ExecutorError> {
        let executor = PostgresExecutor::open(&self.options, schema_name(project_id)).await?;
        Ok(Box::new(executor))
    }
}

/// Project ids are generated hex, but the schema name is still sanitised
/// since it is spliced into DDL.
pub fn schema_name(project_id: &str) -> String {
    let cleaned: String = project_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .map(|c| c.to_ascii_lowercase())
        .collect();
    format!("project_{}", cleaned)
}

#[derive(Debug)]
pub struct PostgresExecutor {
    conn: Option<PgConnection>,
    schema: String,
}

impl PostgresExecutor {
    pub async fn open(options: &PgConnectOptions, schema: String) -> Result<Self, ExecutorError> {
        let mut conn = options.connect().await.map_err(connection_error)?;
        let bootstrap = format!(
            r#"CREATE SCHEMA IF NOT EXISTS "{schema}"; SET search_path TO "{schema}""#
        );
        conn.execute(bootstrap.as_str()).await.map_err(connection_error)?;
        Ok(Self {
            conn: Some(conn),
            schema,
        })
    }
}

#[async_trait]
impl DatabaseExecutor for PostgresExecutor {
    async fn execute(&mut self, sql: &str) -> Result<QueryRows, ExecutorError> {
        let conn = self.conn.as_mut().ok_or(ExecutorError::Closed)?;
        let rows = conn.fetch_all(sql).await.map_err(query_error)?;
        rows.iter().map(row_to_json).collect()
    }

    async fn reset(&mut self) -> Result<(), ExecutorError> {
        let conn = self.conn.as_mut().ok_or(ExecutorError::Closed)?;
        let schema = &self.schema;
        let statement = format!(
            r#"DROP SCHEMA IF EXISTS "{schema}" CASCADE; CREATE SCHEMA "{schema}"; SET search_path TO "{schema}""#
        );
        conn.execute(statement.as_str()).await.map_err(query_error)?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ExecutorError> {
        if let Some(mut conn) = self.conn.take() {
            let statement = format!(r#"DROP SCHEMA IF EXISTS "{}" CASCADE"#, self.schema);
            conn.execute(statement.as_str()).await.map_err(query_error)?;
            conn.close().await.map_err(connection_error)?;
        }
        Ok(())
    }
}

// Simple-query results arrive in text format, so anything without a
// dedicated mapping still decodes as a string.
fn row_to_json(row: &PgRow) -> Result<Value, ExecutorError> {
    let mut object = Map::new();
    for column in row.columns() {
        let index = column.ordinal();
        let raw = row.try_get_raw(index).map_err(query_error)?;

        let value = if raw.is_null() {
            Value::Null
        } else {
            let type_name = raw.type_info().name().to_string();
            match type_name.as_str() {
                "BOOL" => Value::from(row.try_get_unchecked::<bool, _>(index).map_err(query_error)?),
                "INT2" => Value::from(row.try_get_unchecked::<i16, _>(index).map_err(query_error)?),
                "INT4" => Value::from(row.try_get_unchecked::<i32, _>(index).map_err(query_error)?),
                "INT8" => Value::from(row.try_get_unchecked::<i64, _>(index).map_err(query_error)?),
                "FLOAT4" => Value::from(row.try_get_unchecked::<f32, _>(index).map_err(query_error)?),
                "FLOAT8" => Value::from(row.try_get_unchecked::<f64, _>(index).map_err(query_error)?),
                "JSON" | "JSONB" => row.try_get_unchecked::<Value, _>(index).map_err(query_error)?,
                "UUID" => Value::from(
                    row.try_get_unchecked::<uuid::Uuid, _>(index)
                        .map_err(query_error)?
                        .to_string(),
                ),
                "TIMESTAMPTZ" => Value::from(
                    row.try_get_unchecked::<chrono::DateTime<chrono::Utc>, _>(index)
                        .map_err(query_error)?
                        .to_rfc3339(),
                ),
                "BYTEA" => {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_name_is_sanitised() {
        assert_eq!(schema_name("AbC123"), "project_abc123");
        assert_eq!(schema_name(r#"x"; drop schema public; --"#), "project_xdropschemapublic");
    }

    #[test]
    fn test_connector_rejects_malformed_url() {
        let err = PostgresConnector::new("not a url").unwrap_err();
        assert!(matches!(err, ExecutorError::Connection(_)));
    }
}
