use crate::error::{PlatformError, PlatformResult};
use crate::model::{BranchStatus, Migration};
use crate::store::{BranchRegistry, DatabaseHandle, ProjectEntry};

/// Run every migration in the project's ledger, oldest first, against its
/// database. The caller holds the database lock for the whole replay.
///
/// Stops at the first failing statement; the statements before it stay
/// applied. Returns the ledger's tail version on success.
pub async fn replay_ledger(
    entry: &ProjectEntry,
    database: &mut DatabaseHandle,
) -> PlatformResult<Option<String>> {
    let ledger = entry.ledger();

    for migration in ledger.list() {
        if entry.is_retired() {
            return Err(PlatformError::ProjectRetired {
                project_id: entry.id(),
            });
        }
        database
            .execute(&migration.query)
            .await
            .map_err(|err| replay_failure(migration, err))?;
        log::debug!(
            "Replayed migration {} ({}) on project {}",
            migration.version,
            migration.name,
            entry.id()
        );
    }

    Ok(ledger.tail_version())
}

/// Drop the project's database and rebuild it from the ledger
pub async fn reset_and_replay(
    entry: &ProjectEntry,
    database: &mut DatabaseHandle,
) -> PlatformResult<Option<String>> {
    database.reset().await?;
    replay_ledger(entry, database).await
}

/// Write a replay outcome onto every branch backed by `project_id`.
/// A replay cut short by deletion writes nothing.
pub fn record_outcome(
    branches: &BranchRegistry,
    project_id: &str,
    outcome: &PlatformResult<Option<String>>,
) {
    if let Err(PlatformError::ProjectRetired { .. }) = outcome {
        log::debug!("Project {} was deleted during replay", project_id);
        return;
    }

    let status = BranchStatus::from_replay(outcome);
    let updated = branches.record_replay_outcome(project_id, status);
    log::debug!(
        "Recorded {:?} on {} branch(es) of project {}",
        status,
        updated,
        project_id
    );
}

fn replay_failure(migration: &Migration, err: PlatformError) -> PlatformError {
    let message = match err {
        PlatformError::ExecutionFailure { message } => message,
        other => other.to_string(),
    };
    PlatformError::MigrationReplayFailure {
        version: migration.version.clone(),
        name: migration.name.clone(),
        message,
    }
}
