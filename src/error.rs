use std::fmt;

use thiserror::Error;

use crate::model::Id;

pub type PlatformResult<T> = Result<T, PlatformError>;

/// The kind of entity a lookup failed for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Project,
    ParentProject,
    Branch,
    Organization,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntityKind::Project => "Project",
            EntityKind::ParentProject => "Parent project",
            EntityKind::Branch => "Branch",
            EntityKind::Organization => "Organization",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlatformError {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: EntityKind, id: Id },

    #[error("Cannot delete the default branch '{branch_id}'")]
    DefaultBranchProtected { branch_id: Id },

    #[error("Failed to apply migration {version} ({name}): {message}")]
    MigrationReplayFailure {
        version: String,
        name: String,
        message: String,
    },

    #[error("Failed to execute query: {message}")]
    ExecutionFailure { message: String },

    #[error("Migration version {version} must be greater than the ledger tail {tail}")]
    NonMonotonicVersion { version: String, tail: String },

    #[error("Project '{project_id}' has been retired")]
    ProjectRetired { project_id: Id },

    #[error("Database connection failed: {message}")]
    Connection { message: String },

    #[error("Invalid arguments for '{tool}': {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("Unknown tool '{name}'")]
    UnknownTool { name: String },
}

impl PlatformError {
    pub fn not_found(kind: EntityKind, id: impl Into<Id>) -> Self {
        PlatformError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

/// Failures reported by a `DatabaseExecutor`
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutorError {
    #[error("{0}")]
    Query(String),
    #[error("{0}")]
    Connection(String),
    #[error("executor is closed")]
    Closed,
}

impl From<ExecutorError> for PlatformError {
    fn from(err: ExecutorError) -> Self {
        match err {
            ExecutorError::Query(message) => PlatformError::ExecutionFailure { message },
            ExecutorError::Connection(message) => PlatformError::Connection { message },
            ExecutorError::Closed => PlatformError::Connection {
                message: "executor is closed".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_names_entity() {
        let err = PlatformError::not_found(EntityKind::Branch, "br-1");
        assert_eq!(err.to_string(), "Branch 'br-1' not found");
    }

    #[test]
    fn test_executor_query_error_becomes_execution_failure() {
        let err: PlatformError = ExecutorError::Query("syntax error".to_string()).into();
        assert_eq!(
            err,
            PlatformError::ExecutionFailure {
                message: "syntax error".to_string()
            }
        );
    }
}
