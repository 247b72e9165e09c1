use serde::{Deserialize, Serialize};

use crate::model::{generate_id, timestamp_now, Id};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BranchStatus {
    CreatingProject,  // Project registered, replay not finished
    MigrationsPassed, // Last replay on the branch's project succeeded
    MigrationsFailed, // Last replay stopped at a failing migration
}

impl BranchStatus {
    pub fn from_replay<T, E>(outcome: &Result<T, E>) -> Self {
        match outcome {
            Ok(_) => BranchStatus::MigrationsPassed,
            Err(_) => BranchStatus::MigrationsFailed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub id: Id,
    pub name: String,
    pub project_ref: Id,        // Project holding this branch's database
    pub parent_project_ref: Id, // Project it was branched from
    pub is_default: bool,
    pub persistent: bool,
    pub status: BranchStatus,
    pub created_at: String, // ISO 8601 timestamp
    pub updated_at: String, // ISO 8601 timestamp
}

impl Branch {
    /// The marker branch standing in for the parent project itself.
    /// Its database already is the parent's, so there is nothing to replay.
    pub fn new_default_branch(parent_project_ref: Id, name: String) -> Self {
        let now = timestamp_now();
        Self {
            id: generate_id(),
            name,
            project_ref: parent_project_ref.clone(),
            parent_project_ref,
            is_default: true,
            persistent: false,
            status: BranchStatus::MigrationsPassed,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn new_from_project(parent_project_ref: Id, project_ref: Id, name: String) -> Self {
        let now = timestamp_now();
        Self {
            id: generate_id(),
            name,
            project_ref,
            parent_project_ref,
            is_default: false,
            persistent: false,
            status: BranchStatus::CreatingProject,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn set_status(&mut self, status: BranchStatus) {
        self.status = status;
        self.updated_at = timestamp_now();
    }

    pub fn can_be_deleted(&self) -> bool {
        !self.is_default
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_branch_points_at_parent() {
        let branch = Branch::new_default_branch("proj-1".to_string(), "main".to_string());
        assert!(branch.is_default);
        assert_eq!(branch.project_ref, "proj-1");
        assert_eq!(branch.parent_project_ref, "proj-1");
        assert_eq!(branch.status, BranchStatus::MigrationsPassed);
        assert!(!branch.can_be_deleted());
    }

    #[test]
    fn test_working_branch_starts_creating() {
        let branch = Branch::new_from_project(
            "proj-1".to_string(),
            "proj-2".to_string(),
            "develop".to_string(),
        );
        assert!(!branch.is_default);
        assert_eq!(branch.status, BranchStatus::CreatingProject);
        assert!(branch.can_be_deleted());

        let json = serde_json::to_value(&branch).unwrap();
        assert_eq!(json["status"], "CREATING_PROJECT");
        assert_eq!(json["project_ref"], "proj-2");
    }

    #[test]
    fn test_status_from_replay_outcome() {
        let ok: Result<(), ()> = Ok(());
        let failed: Result<(), ()> = Err(());
        assert_eq!(BranchStatus::from_replay(&ok), BranchStatus::MigrationsPassed);
        assert_eq!(BranchStatus::from_replay(&failed), BranchStatus::MigrationsFailed);
    }
}
