use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::error::{EntityKind, PlatformError, PlatformResult};
use crate::model::{Branch, BranchStatus, Id};

struct Registered {
    seq: u64,
    branch: Branch,
}

/// Maps branch ids to branch state and enforces default-branch protection
#[derive(Default)]
pub struct BranchRegistry {
    entries: RwLock<HashMap<Id, Registered>>,
    next_seq: AtomicU64,
}

impl BranchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the hidden default branch for `parent_project_ref` unless the
    /// project already has branches. Check and insert share one write lock.
    pub fn ensure_default(&self, parent_project_ref: &Id, name: &str) -> Option<Branch> {
        let mut entries = self.entries.write();
        let has_branches = entries
            .values()
            .any(|registered| &registered.branch.parent_project_ref == parent_project_ref);
        if has_branches {
            return None;
        }

        let branch = Branch::new_default_branch(parent_project_ref.clone(), name.to_string());
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        entries.insert(
            branch.id.clone(),
            Registered {
                seq,
                branch: branch.clone(),
            },
        );
        Some(branch)
    }

    pub fn insert(&self, branch: Branch) {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        self.entries
            .write()
            .insert(branch.id.clone(), Registered { seq, branch });
    }

    pub fn get(&self, id: &str) -> PlatformResult<Branch> {
        self.entries
            .read()
            .get(id)
            .map(|registered| registered.branch.clone())
            .ok_or_else(|| PlatformError::not_found(EntityKind::Branch, id))
    }

    /// Branches of a project in creation order. Empty means branching has
    /// never been used for it.
    pub fn list(&self, parent_project_ref: &str) -> Vec<Branch> {
        let entries = self.entries.read();
        let mut registered: Vec<&Registered> = entries
            .values()
            .filter(|registered| registered.branch.parent_project_ref == parent_project_ref)
            .collect();
        registered.sort_by_key(|registered| registered.seq);
        registered
            .into_iter()
            .map(|registered| registered.branch.clone())
            .collect()
    }

    /// Look up a branch for deletion, refusing the default branch
    pub fn get_deletable(&self, id: &str) -> PlatformResult<Branch> {
        let branch = self.get(id)?;
        if !branch.can_be_deleted() {
            return Err(PlatformError::DefaultBranchProtected {
                branch_id: branch.id,
            });
        }
        Ok(branch)
    }

    pub fn remove(&self, id: &str) -> Option<Branch> {
        self.entries
            .write()
            .remove(id)
            .map(|registered| registered.branch)
    }

    /// Returns false when the branch is gone
    pub fn set_status(&self, id: &str, status: BranchStatus) -> bool {
        match self.entries.write().get_mut(id) {
            Some(registered) => {
                registered.branch.set_status(status);
                true
            }
            None => false,
        }
    }

    /// Record a replay outcome on every branch whose database is `project_ref`.
    /// Returns how many branches were updated.
    pub fn record_replay_outcome(&self, project_ref: &str, status: BranchStatus) -> usize {
        let mut entries = self.entries.write();
        let mut updated = 0;
        for registered in entries.values_mut() {
            if registered.branch.project_ref == project_ref {
                registered.branch.set_status(status);
                updated += 1;
            }
        }
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn working_branch(parent: &str, project: &str, name: &str) -> Branch {
        Branch::new_from_project(parent.to_string(), project.to_string(), name.to_string())
    }

    #[test]
    fn test_default_branch_created_once_per_parent() {
        let registry = BranchRegistry::new();
        let parent = "proj-1".to_string();

        let default = registry.ensure_default(&parent, "main").unwrap();
        assert!(default.is_default);
        assert_eq!(default.status, BranchStatus::MigrationsPassed);
        assert!(registry.ensure_default(&parent, "main").is_none());

        // A different parent gets its own
        assert!(registry.ensure_default(&"proj-2".to_string(), "main").is_some());
    }

    #[test]
    fn test_list_filters_by_parent_in_creation_order() {
        let registry = BranchRegistry::new();
        let parent = "proj-1".to_string();
        registry.ensure_default(&parent, "main");
        registry.insert(working_branch("proj-1", "proj-a", "develop"));
        registry.insert(working_branch("proj-9", "proj-b", "other"));
        registry.insert(working_branch("proj-1", "proj-c", "feature"));

        let names: Vec<String> = registry.list("proj-1").into_iter().map(|b| b.name).collect();
        assert_eq!(names, vec!["main", "develop", "feature"]);
        assert!(registry.list("proj-unused").is_empty());
    }

    #[test]
    fn test_default_branch_is_never_deletable() {
        let registry = BranchRegistry::new();
        let default = registry.ensure_default(&"proj-1".to_string(), "main").unwrap();

        for status in [
            BranchStatus::CreatingProject,
            BranchStatus::MigrationsPassed,
            BranchStatus::MigrationsFailed,
        ] {
            registry.set_status(&default.id, status);
            assert_eq!(
                registry.get_deletable(&default.id).unwrap_err(),
                PlatformError::DefaultBranchProtected {
                    branch_id: default.id.clone()
                }
            );
        }
    }

    #[test]
    fn test_status_write_to_removed_branch_is_noop() {
        let registry = BranchRegistry::new();
        let branch = working_branch("proj-1", "proj-2", "develop");
        registry.insert(branch.clone());
        assert!(registry.remove(&branch.id).is_some());

        assert!(!registry.set_status(&branch.id, BranchStatus::MigrationsPassed));
        assert_eq!(registry.record_replay_outcome("proj-2", BranchStatus::MigrationsPassed), 0);
    }

    #[test]
    fn test_replay_outcome_targets_project_ref() {
        let registry = BranchRegistry::new();
        let default = registry.ensure_default(&"proj-1".to_string(), "main").unwrap();
        let branch = working_branch("proj-1", "proj-2", "develop");
        registry.insert(branch.clone());

        assert_eq!(registry.record_replay_outcome("proj-1", BranchStatus::MigrationsFailed), 1);
        assert_eq!(registry.get(&default.id).unwrap().status, BranchStatus::MigrationsFailed);
        assert_eq!(registry.get(&branch.id).unwrap().status, BranchStatus::CreatingProject);
    }
}
