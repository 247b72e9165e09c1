use std::sync::Arc;

use crate::config::PlatformConfig;
use crate::model::VersionClock;
use crate::store::branches::BranchRegistry;
use crate::store::executor::ExecutorConnector;
use crate::store::projects::ProjectRegistry;
use crate::store::sqlite::SqliteConnector;
use crate::store::tasks::BackgroundTasks;

/// Shared state behind every operation: both registries, the version clock
/// and the background replay tracker.
pub struct Platform {
    pub(crate) projects: Arc<ProjectRegistry>,
    pub(crate) branches: Arc<BranchRegistry>,
    pub(crate) clock: VersionClock,
    pub(crate) tasks: BackgroundTasks,
    pub(crate) config: PlatformConfig,
}

impl Platform {
    pub fn new(connector: Arc<dyn ExecutorConnector>, config: PlatformConfig) -> Self {
        Self {
            projects: Arc::new(ProjectRegistry::new(connector)),
            branches: Arc::new(BranchRegistry::new()),
            clock: VersionClock::new(),
            tasks: BackgroundTasks::new(),
            config,
        }
    }

    /// Platform whose projects each get an in-memory SQLite database
    pub fn embedded(config: PlatformConfig) -> Self {
        Self::new(Arc::new(SqliteConnector), config)
    }

    pub fn projects(&self) -> &ProjectRegistry {
        &self.projects
    }

    pub fn branches(&self) -> &BranchRegistry {
        &self.branches
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    /// Await the background work started for a project or branch id
    /// (activation for projects, replay for branches).
    pub async fn wait_for_background(&self, id: &str) {
        self.tasks.wait(id).await;
    }
}
