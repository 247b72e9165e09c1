use std::sync::Arc;

use tokio::sync::OwnedMutexGuard;

use crate::error::{EntityKind, PlatformError, PlatformResult};
use crate::logic::replay::{record_outcome, replay_ledger, reset_and_replay};
use crate::model::{Branch, BranchStatus, Id, MigrationVersion, NewProject};
use crate::store::{BranchRegistry, DatabaseHandle, Platform, ProjectEntry};

pub struct BranchOperations;

impl BranchOperations {
    /// Create a branch of `project_id` backed by a new project.
    ///
    /// The new project starts with a copy of the parent's ledger. Replaying
    /// it happens in the background under the branch id, so the branch is
    /// returned with status `CREATING_PROJECT`. The child's database stays
    /// locked from before it is registered until the replay ends.
    pub async fn create_branch(
        platform: &Platform,
        project_id: &str,
        name: &str,
    ) -> PlatformResult<Branch> {
        let parent = platform.projects.get(project_id)?;
        let parent_project = parent.project();

        if let Some(default) = platform
            .branches
            .ensure_default(&parent_project.id, &platform.config.main_branch_name)
        {
            log::info!(
                "Enabled branching for project {} with default branch {}",
                parent_project.id,
                default.id
            );
        }

        let (child, database) = platform
            .projects
            .create_claimed(NewProject::for_branch(&parent_project, name), parent.ledger())
            .await;
        let branch = Branch::new_from_project(parent_project.id.clone(), child.id(), name.to_string());
        platform.branches.insert(branch.clone());
        log::info!(
            "Created branch {} ('{}') of project {} backed by project {}",
            branch.id,
            branch.name,
            parent_project.id,
            branch.project_ref
        );

        platform.tasks.spawn(
            branch.id.clone(),
            replay_new_branch(child, database, platform.branches.clone(), branch.id.clone()),
        );

        Ok(branch)
    }

    pub fn list_branches(platform: &Platform, project_id: &str) -> Vec<Branch> {
        platform.branches.list(project_id)
    }

    /// Remove a non-default branch and destroy its project. A replay still
    /// running for it stops at its next statement.
    pub async fn delete_branch(platform: &Platform, branch_id: &str) -> PlatformResult<Branch> {
        let branch = platform.branches.get_deletable(branch_id)?;
        // Fail before unlinking anything if the project is already gone
        platform.projects.get(&branch.project_ref)?;

        platform.branches.remove(branch_id);
        platform.tasks.forget(branch_id);
        platform.projects.destroy(&branch.project_ref).await?;

        log::info!("Deleted branch {} and project {}", branch_id, branch.project_ref);
        Ok(branch)
    }

    /// Make the parent's ledger equal to the branch's and rebuild the
    /// parent's database from it.
    pub async fn merge_branch(platform: &Platform, branch_id: &str) -> PlatformResult<MigrationVersion> {
        let branch = platform.branches.get(branch_id)?;
        let parent = platform
            .projects
            .lookup(&branch.parent_project_ref, EntityKind::ParentProject)?;
        let source = platform.projects.get(&branch.project_ref)?;

        log::info!(
            "Merging branch {} into project {}",
            branch_id,
            branch.parent_project_ref
        );
        let version = Self::adopt_ledger(platform, &parent, &source).await?;
        Ok(MigrationVersion {
            migration_version: version,
        })
    }

    /// Make the branch's ledger equal to the parent's and rebuild the
    /// branch's database from it.
    pub async fn rebase_branch(platform: &Platform, branch_id: &str) -> PlatformResult<MigrationVersion> {
        let branch = platform.branches.get(branch_id)?;
        let parent = platform
            .projects
            .lookup(&branch.parent_project_ref, EntityKind::ParentProject)?;
        let target = platform.projects.get(&branch.project_ref)?;

        log::info!(
            "Rebasing branch {} onto project {}",
            branch_id,
            branch.parent_project_ref
        );
        let version = Self::adopt_ledger(platform, &target, &parent).await?;
        Ok(MigrationVersion {
            migration_version: version,
        })
    }

    /// Rebuild the branch's database, first dropping every migration newer
    /// than `migration_version` when one is given. `"0"` drops them all.
    pub async fn reset_branch(
        platform: &Platform,
        branch_id: &str,
        migration_version: Option<&str>,
    ) -> PlatformResult<MigrationVersion> {
        let branch = platform.branches.get(branch_id)?;
        let project = platform.projects.get(&branch.project_ref)?;

        let outcome = {
            let mut database = project.lock_database().await;
            if let Some(bound) = migration_version.filter(|version| !version.is_empty()) {
                let removed = project.truncate_ledger(Some(bound));
                log::info!(
                    "Dropped {} migration(s) after {} from branch {}",
                    removed,
                    bound,
                    branch_id
                );
            }
            reset_and_replay(&project, &mut database).await
        };

        let version = Self::finish_replay(platform, &project.id(), outcome)?;
        Ok(MigrationVersion {
            migration_version: version,
        })
    }

    /// Swap `target`'s ledger for a snapshot of `source`'s, then reset and
    /// replay `target`. The snapshot is taken before `target` is locked, so
    /// no two project locks are ever held together.
    async fn adopt_ledger(
        platform: &Platform,
        target: &ProjectEntry,
        source: &ProjectEntry,
    ) -> PlatformResult<Option<String>> {
        let incoming = source.ledger();

        let outcome = {
            let mut database = target.lock_database().await;
            target.replace_ledger(incoming);
            reset_and_replay(target, &mut database).await
        };

        Self::finish_replay(platform, &target.id(), outcome)
    }

    fn finish_replay(
        platform: &Platform,
        project_id: &str,
        outcome: PlatformResult<Option<String>>,
    ) -> PlatformResult<Option<String>> {
        record_outcome(&platform.branches, project_id, &outcome);
        match &outcome {
            Ok(version) => log::info!(
                "Project {} rebuilt up to migration {}",
                project_id,
                version.as_deref().unwrap_or("none")
            ),
            Err(err) => log::warn!("Rebuilding project {} failed: {}", project_id, err),
        }
        outcome
    }
}

async fn replay_new_branch(
    project: Arc<ProjectEntry>,
    mut database: OwnedMutexGuard<DatabaseHandle>,
    branches: Arc<BranchRegistry>,
    branch_id: Id,
) {
    let project_id = project.id();

    let outcome = match project.activate_locked(&mut database).await {
        Ok(()) => replay_ledger(&project, &mut database).await,
        Err(err) => Err(err),
    };
    drop(database);

    match &outcome {
        Err(PlatformError::ProjectRetired { .. }) => {
            log::debug!("Branch {} was deleted before its replay finished", branch_id);
            return;
        }
        Ok(_) => log::info!("Branch {} is ready on project {}", branch_id, project_id),
        Err(err) => log::warn!("Branch {} replay failed: {}", branch_id, err),
    }

    if !branches.set_status(&branch_id, BranchStatus::from_replay(&outcome)) {
        log::debug!("Branch {} is gone, dropping its replay status", branch_id);
    }
}
