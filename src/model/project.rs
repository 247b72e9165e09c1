use serde::{Deserialize, Serialize};

use crate::model::{generate_id, timestamp_now, Id};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    Unknown,
    ActiveHealthy,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Id,
    pub organization_id: Id,
    pub name: String,
    pub region: String,
    pub created_at: String, // ISO 8601 timestamp
    pub status: ProjectStatus,
}

/// Connection facts reported by `get_project`; never part of a creation response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    pub host: String,
    pub version: String,
    pub postgres_engine: String,
    pub release_channel: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDetails {
    #[serde(flatten)]
    pub project: Project,
    pub database: DatabaseInfo,
}

impl Project {
    pub fn new(new_project: NewProject) -> Self {
        Self {
            id: generate_id(),
            organization_id: new_project.organization_id,
            name: new_project.name,
            region: new_project.region,
            created_at: timestamp_now(),
            status: ProjectStatus::Unknown,
        }
    }

    pub fn database_info(&self) -> DatabaseInfo {
        DatabaseInfo {
            host: format!("db.{}.pgbranch.dev", self.id),
            version: "15.1".to_string(),
            postgres_engine: "15".to_string(),
            release_channel: "ga".to_string(),
        }
    }

    pub fn details(&self) -> ProjectDetails {
        ProjectDetails {
            project: self.clone(),
            database: self.database_info(),
        }
    }
}

/// Input model for creating a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    pub organization_id: Id,
    pub region: String,
}

impl NewProject {
    /// Spec for a branch's own project, inheriting the parent's placement
    pub fn for_branch(parent: &Project, branch_name: &str) -> Self {
        Self {
            name: format!("{} - {}", parent.name, branch_name),
            organization_id: parent.organization_id.clone(),
            region: parent.region.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: Id,
    pub name: String,
}
