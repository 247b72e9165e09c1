use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{ExecutorError, PlatformError, PlatformResult};
use crate::model::Id;

/// Rows produced by a statement, one JSON object per row
pub type QueryRows = Vec<Value>;

/// A relational engine bound to one project. SQL is passed through untouched.
#[async_trait]
pub trait DatabaseExecutor: Send {
    async fn execute(&mut self, sql: &str) -> Result<QueryRows, ExecutorError>;

    /// Drop everything and start over with an empty database
    async fn reset(&mut self) -> Result<(), ExecutorError>;

    /// Release the engine. Calling it again is a no-op.
    async fn close(&mut self) -> Result<(), ExecutorError>;
}

/// Opens a fresh executor for a project
#[async_trait]
pub trait ExecutorConnector: Send + Sync {
    async fn connect(&self, project_id: &Id) -> Result<Box<dyn DatabaseExecutor>, ExecutorError>;
}

/// Handle slot a project holds for its executor.
///
/// The executor is opened on first use, and `close` retires the slot for
/// good: later calls fail with `ProjectRetired` instead of reopening.
pub struct DatabaseHandle {
    project_id: Id,
    connector: Arc<dyn ExecutorConnector>,
    executor: Option<Box<dyn DatabaseExecutor>>,
    closed: bool,
}

impl DatabaseHandle {
    pub fn new(project_id: Id, connector: Arc<dyn ExecutorConnector>) -> Self {
        Self {
            project_id,
            connector,
            executor: None,
            closed: false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.executor.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub async fn open(&mut self) -> PlatformResult<()> {
        if self.closed {
            return Err(PlatformError::ProjectRetired {
                project_id: self.project_id.clone(),
            });
        }
        if self.executor.is_none() {
            let executor = self.connector.connect(&self.project_id).await?;
            log::debug!("Opened database executor for project {}", self.project_id);
            self.executor = Some(executor);
        }
        Ok(())
    }

    pub async fn execute(&mut self, sql: &str) -> PlatformResult<QueryRows> {
        self.open().await?;
        match self.executor.as_mut() {
            Some(executor) => Ok(executor.execute(sql).await?),
            None => Err(ExecutorError::Closed.into()),
        }
    }

    /// Full drop-and-recreate of the project's database
    pub async fn reset(&mut self) -> PlatformResult<()> {
        self.open().await?;
        match self.executor.as_mut() {
            Some(executor) => Ok(executor.reset().await?),
            None => Err(ExecutorError::Closed.into()),
        }
    }

    pub async fn close(&mut self) -> PlatformResult<()> {
        self.closed = true;
        if let Some(mut executor) = self.executor.take() {
            executor.close().await?;
            log::debug!("Closed database executor for project {}", self.project_id);
        }
        Ok(())
    }
}

/// Database errors keep only the engine's message
pub(crate) fn query_error(err: sqlx::Error) -> ExecutorError {
    match err.as_database_error() {
        Some(db_err) => ExecutorError::Query(db_err.message().to_string()),
        None => ExecutorError::Query(err.to_string()),
    }
}

pub(crate) fn connection_error(err: sqlx::Error) -> ExecutorError {
    ExecutorError::Connection(err.to_string())
}

impl std::fmt::Debug for DatabaseHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseHandle")
            .field("project_id", &self.project_id)
            .field("open", &self.is_open())
            .field("closed", &self.closed)
            .finish()
    }
}
