use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard};

use crate::error::{EntityKind, PlatformError, PlatformResult};
use crate::model::{Id, Migration, MigrationSummary, NewProject, Project, ProjectStatus};
use crate::store::executor::{DatabaseHandle, ExecutorConnector};
use crate::store::ledger::MigrationLedger;

/// Live state of one project: metadata, migration ledger and database handle.
///
/// Anything that mutates the database or the ledger holds the `database`
/// mutex for its whole duration. The ledger's own lock only guards reads
/// that must not wait behind a long replay.
#[derive(Debug)]
pub struct ProjectEntry {
    project: RwLock<Project>,
    ledger: RwLock<MigrationLedger>,
    database: Arc<Mutex<DatabaseHandle>>,
    retired: AtomicBool,
}

impl ProjectEntry {
    fn new(project: Project, ledger: MigrationLedger, connector: Arc<dyn ExecutorConnector>) -> Self {
        let database = DatabaseHandle::new(project.id.clone(), connector);
        Self {
            project: RwLock::new(project),
            ledger: RwLock::new(ledger),
            database: Arc::new(Mutex::new(database)),
            retired: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> Id {
        self.project.read().id.clone()
    }

    pub fn project(&self) -> Project {
        self.project.read().clone()
    }

    pub fn set_status(&self, status: ProjectStatus) {
        self.project.write().status = status;
    }

    pub fn ledger(&self) -> MigrationLedger {
        self.ledger.read().clone()
    }

    pub fn migrations(&self) -> Vec<MigrationSummary> {
        self.ledger.read().summaries()
    }

    pub fn tail_version(&self) -> Option<String> {
        self.ledger.read().tail_version()
    }

    /// Caller must hold the database lock
    pub(crate) fn append_migration(&self, migration: Migration) -> PlatformResult<()> {
        self.ledger.write().append(migration)
    }

    /// Caller must hold the database lock
    pub(crate) fn replace_ledger(&self, ledger: MigrationLedger) {
        self.ledger.write().replace_with(ledger);
    }

    /// Caller must hold the database lock
    pub(crate) fn truncate_ledger(&self, bound: Option<&str>) -> usize {
        self.ledger.write().truncate_to(bound)
    }

    pub async fn lock_database(&self) -> MutexGuard<'_, DatabaseHandle> {
        self.database.lock().await
    }

    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::SeqCst)
    }

    fn retire(&self) {
        self.retired.store(true, Ordering::SeqCst);
    }

    /// Open the executor and promote a still-pending project to active.
    /// A project paused or retired in the meantime stays as it is.
    pub async fn activate(&self) -> PlatformResult<()> {
        let mut database = self.lock_database().await;
        self.activate_locked(&mut database).await
    }

    /// `activate` for a caller already holding the database lock
    pub async fn activate_locked(&self, database: &mut DatabaseHandle) -> PlatformResult<()> {
        if self.is_retired() {
            return Err(PlatformError::ProjectRetired { project_id: self.id() });
        }
        database.open().await?;

        let mut project = self.project.write();
        if project.status == ProjectStatus::Unknown {
            project.status = ProjectStatus::ActiveHealthy;
        }
        Ok(())
    }
}

struct Registered {
    seq: u64,
    entry: Arc<ProjectEntry>,
}

/// Maps project ids to live project state and owns their executors
pub struct ProjectRegistry {
    entries: RwLock<HashMap<Id, Registered>>,
    next_seq: AtomicU64,
    connector: Arc<dyn ExecutorConnector>,
}

impl ProjectRegistry {
    pub fn new(connector: Arc<dyn ExecutorConnector>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
            connector,
        }
    }

    /// Register a project in `UNKNOWN` status. Activation is the caller's
    /// background step (`ProjectEntry::activate`).
    pub fn create(&self, new_project: NewProject) -> Arc<ProjectEntry> {
        self.create_seeded(new_project, MigrationLedger::new())
    }

    /// Like `create`, with the ledger already holding `ledger`'s migrations
    /// by the time the project becomes visible.
    pub fn create_seeded(&self, new_project: NewProject, ledger: MigrationLedger) -> Arc<ProjectEntry> {
        let entry = self.build(new_project, ledger);
        self.register(entry.clone());
        entry
    }

    /// Like `create_seeded`, but the database lock is taken before the
    /// project becomes visible and handed back to the caller. Nothing else
    /// can touch the database until that guard is dropped.
    pub async fn create_claimed(
        &self,
        new_project: NewProject,
        ledger: MigrationLedger,
    ) -> (Arc<ProjectEntry>, OwnedMutexGuard<DatabaseHandle>) {
        let entry = self.build(new_project, ledger);
        let database = entry.database.clone().lock_owned().await;
        self.register(entry.clone());
        (entry, database)
    }

    fn build(&self, new_project: NewProject, ledger: MigrationLedger) -> Arc<ProjectEntry> {
        let project = Project::new(new_project);
        Arc::new(ProjectEntry::new(project, ledger, self.connector.clone()))
    }

    fn register(&self, entry: Arc<ProjectEntry>) {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        self.entries
            .write()
            .insert(entry.id(), Registered { seq, entry });
    }

    pub fn get(&self, id: &str) -> PlatformResult<Arc<ProjectEntry>> {
        self.lookup(id, EntityKind::Project)
    }

    pub fn lookup(&self, id: &str, kind: EntityKind) -> PlatformResult<Arc<ProjectEntry>> {
        self.entries
            .read()
            .get(id)
            .map(|registered| registered.entry.clone())
            .ok_or_else(|| PlatformError::not_found(kind, id))
    }

    /// Projects in creation order
    pub fn list(&self) -> Vec<Project> {
        let entries = self.entries.read();
        let mut registered: Vec<&Registered> = entries.values().collect();
        registered.sort_by_key(|registered| registered.seq);
        registered
            .into_iter()
            .map(|registered| registered.entry.project())
            .collect()
    }

    /// Retire, unregister and close the project's executor.
    ///
    /// The entry leaves the registry before the database lock is awaited, so
    /// an in-flight replay sees the retired flag and stops at its next
    /// statement.
    pub async fn destroy(&self, id: &str) -> PlatformResult<()> {
        let registered = self
            .entries
            .write()
            .remove(id)
            .ok_or_else(|| PlatformError::not_found(EntityKind::Project, id))?;
        let entry = registered.entry;
        entry.retire();

        let mut database = entry.lock_database().await;
        database.close().await?;
        log::info!("Destroyed project {}", id);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::sqlite::SqliteConnector;

    fn registry() -> ProjectRegistry {
        ProjectRegistry::new(Arc::new(SqliteConnector))
    }

    fn new_project(name: &str) -> NewProject {
        NewProject {
            name: name.to_string(),
            organization_id: "org-1".to_string(),
            region: "us-east-1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_registers_unknown_project() {
        let registry = registry();
        let entry = registry.create(new_project("shop"));

        let fetched = registry.get(&entry.id()).unwrap();
        assert_eq!(fetched.project().name, "shop");
        assert_eq!(fetched.project().status, ProjectStatus::Unknown);
        assert!(fetched.ledger().is_empty());
    }

    #[tokio::test]
    async fn test_activate_promotes_status() {
        let registry = registry();
        let entry = registry.create(new_project("shop"));
        entry.activate().await.unwrap();
        assert_eq!(entry.project().status, ProjectStatus::ActiveHealthy);
    }

    #[tokio::test]
    async fn test_activate_keeps_paused_status() {
        let registry = registry();
        let entry = registry.create(new_project("shop"));
        entry.set_status(ProjectStatus::Inactive);
        entry.activate().await.unwrap();
        assert_eq!(entry.project().status, ProjectStatus::Inactive);
    }

    #[tokio::test]
    async fn test_create_seeded_carries_ledger() {
        let registry = registry();
        let mut ledger = MigrationLedger::new();
        ledger
            .append(Migration {
                version: "20250101000000".to_string(),
                name: "init".to_string(),
                query: "create table t(id int)".to_string(),
            })
            .unwrap();

        let entry = registry.create_seeded(new_project("shop - develop"), ledger.clone());
        assert_eq!(entry.ledger(), ledger);
        assert_eq!(entry.tail_version().as_deref(), Some("20250101000000"));
    }

    #[tokio::test]
    async fn test_create_claimed_holds_database_until_released() {
        let registry = registry();
        let (entry, mut database) = registry
            .create_claimed(new_project("shop - develop"), MigrationLedger::new())
            .await;
        assert!(registry.get(&entry.id()).is_ok());

        let waiter = {
            let entry = entry.clone();
            tokio::spawn(async move {
                let mut database = entry.lock_database().await;
                database.execute("select * from claimed").await
            })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        database.execute("create table claimed(id int)").await.unwrap();
        drop(database);
        assert!(waiter.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_list_in_creation_order() {
        let registry = registry();
        for name in ["a", "b", "c"] {
            registry.create(new_project(name));
        }
        let names: Vec<String> = registry.list().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_destroy_removes_and_retires() {
        let registry = registry();
        let entry = registry.create(new_project("shop"));
        let id = entry.id();
        entry.activate().await.unwrap();

        registry.destroy(&id).await.unwrap();

        assert!(entry.is_retired());
        assert!(registry.is_empty());
        assert_eq!(
            registry.get(&id).unwrap_err(),
            PlatformError::not_found(EntityKind::Project, id.clone())
        );
        assert!(matches!(
            entry.activate().await.unwrap_err(),
            PlatformError::ProjectRetired { .. }
        ));

        // A second destroy is a lookup failure, not a double close
        assert!(matches!(
            registry.destroy(&id).await.unwrap_err(),
            PlatformError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_unknown_project_is_not_found() {
        let registry = registry();
        let err = registry.get("missing").unwrap_err();
        assert_eq!(err.to_string(), "Project 'missing' not found");
    }
}
