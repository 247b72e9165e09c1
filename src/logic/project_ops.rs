use crate::error::{EntityKind, PlatformError, PlatformResult};
use crate::model::{
    Id, Migration, MigrationSummary, NewProject, Organization, Project, ProjectDetails,
    ProjectStatus,
};
use crate::store::{Platform, QueryRows};

pub struct ProjectOperations;

impl ProjectOperations {
    /// Register a project and start its activation in the background.
    ///
    /// The project comes back with status `UNKNOWN`; activation is tracked
    /// under the project id.
    pub fn create_project(
        platform: &Platform,
        name: String,
        organization_id: Id,
        region: Option<String>,
    ) -> Project {
        let region = region.unwrap_or_else(|| platform.config.default_region.clone());
        let entry = platform.projects.create(NewProject {
            name,
            organization_id,
            region,
        });
        let project = entry.project();
        log::info!("Created project {} ('{}')", project.id, project.name);

        let project_id = project.id.clone();
        platform.tasks.spawn(project.id.clone(), async move {
            match entry.activate().await {
                Ok(()) => log::debug!("Activated project {}", project_id),
                Err(err) => log::warn!("Could not activate project {}: {}", project_id, err),
            }
        });

        project
    }

    pub fn get_project(platform: &Platform, project_id: &str) -> PlatformResult<ProjectDetails> {
        Ok(platform.projects.get(project_id)?.project().details())
    }

    pub fn list_projects(platform: &Platform) -> Vec<Project> {
        platform.projects.list()
    }

    pub fn pause_project(platform: &Platform, project_id: &str) -> PlatformResult<Project> {
        Self::set_status(platform, project_id, ProjectStatus::Inactive)
    }

    pub fn restore_project(platform: &Platform, project_id: &str) -> PlatformResult<Project> {
        Self::set_status(platform, project_id, ProjectStatus::ActiveHealthy)
    }

    fn set_status(
        platform: &Platform,
        project_id: &str,
        status: ProjectStatus,
    ) -> PlatformResult<Project> {
        let entry = platform.projects.get(project_id)?;
        entry.set_status(status);
        log::info!("Project {} is now {:?}", project_id, status);
        Ok(entry.project())
    }

    pub fn list_migrations(
        platform: &Platform,
        project_id: &str,
    ) -> PlatformResult<Vec<MigrationSummary>> {
        Ok(platform.projects.get(project_id)?.migrations())
    }

    /// Execute `query` and, only if it succeeds, record it in the ledger
    /// under a freshly issued version.
    pub async fn apply_migration(
        platform: &Platform,
        project_id: &str,
        name: String,
        query: String,
    ) -> PlatformResult<QueryRows> {
        let entry = platform.projects.get(project_id)?;
        let mut database = entry.lock_database().await;

        let rows = database.execute(&query).await?;

        let version = platform.clock.next_after(entry.tail_version().as_deref());
        log::info!(
            "Applied migration {} ({}) to project {}",
            version,
            name,
            project_id
        );
        entry.append_migration(Migration {
            version,
            name,
            query,
        })?;

        Ok(rows)
    }

    /// Run arbitrary SQL without touching the ledger
    pub async fn execute_sql(
        platform: &Platform,
        project_id: &str,
        query: &str,
    ) -> PlatformResult<QueryRows> {
        let entry = platform.projects.get(project_id)?;
        let mut database = entry.lock_database().await;
        database.execute(query).await
    }

    pub fn list_organizations(platform: &Platform) -> Vec<Organization> {
        platform.config.organizations.clone()
    }

    pub fn get_organization(platform: &Platform, organization_id: &str) -> PlatformResult<Organization> {
        platform
            .config
            .organizations
            .iter()
            .find(|org| org.id == organization_id)
            .cloned()
            .ok_or_else(|| PlatformError::not_found(EntityKind::Organization, organization_id))
    }

    pub fn get_project_url(platform: &Platform, project_id: &str) -> PlatformResult<String> {
        let entry = platform.projects.get(project_id)?;
        Ok(platform
            .config
            .project_url_template
            .replace("{project_id}", &entry.id()))
    }
}
