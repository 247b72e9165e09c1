use itertools::Itertools;

use crate::error::{PlatformError, PlatformResult};
use crate::model::{Migration, MigrationSummary};

/// Ordered record of the migrations considered applied to one project.
///
/// Versions are strictly increasing. The only removals are explicit
/// truncation and wholesale replacement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationLedger {
    migrations: Vec<Migration>,
}

impl MigrationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_migrations(migrations: Vec<Migration>) -> PlatformResult<Self> {
        if let Some((previous, next)) = migrations
            .iter()
            .tuple_windows()
            .find(|(previous, next)| previous.version >= next.version)
        {
            return Err(PlatformError::NonMonotonicVersion {
                version: next.version.clone(),
                tail: previous.version.clone(),
            });
        }
        Ok(Self { migrations })
    }

    pub fn append(&mut self, migration: Migration) -> PlatformResult<()> {
        if let Some(tail) = self.tail() {
            if migration.version <= tail.version {
                return Err(PlatformError::NonMonotonicVersion {
                    version: migration.version,
                    tail: tail.version.clone(),
                });
            }
        }
        self.migrations.push(migration);
        Ok(())
    }

    /// Drop every migration newer than `bound`; `None` drops everything.
    /// Returns how many were removed.
    pub fn truncate_to(&mut self, bound: Option<&str>) -> usize {
        let before = self.migrations.len();
        match bound {
            Some(bound) => self
                .migrations
                .retain(|migration| migration.version.as_str() <= bound),
            None => self.migrations.clear(),
        }
        before - self.migrations.len()
    }

    pub fn replace_with(&mut self, other: MigrationLedger) {
        self.migrations = other.migrations;
    }

    /// Ascending by version; each call starts a fresh pass
    pub fn list(&self) -> impl Iterator<Item = &Migration> + '_ {
        self.migrations.iter()
    }

    pub fn summaries(&self) -> Vec<MigrationSummary> {
        self.list().map(MigrationSummary::from).collect()
    }

    pub fn tail(&self) -> Option<&Migration> {
        self.migrations.last()
    }

    pub fn tail_version(&self) -> Option<String> {
        self.tail().map(|migration| migration.version.clone())
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BEFORE_ALL_MIGRATIONS;

    fn migration(version: &str, name: &str) -> Migration {
        Migration {
            version: version.to_string(),
            name: name.to_string(),
            query: format!("create table {}(id int)", name),
        }
    }

    fn ledger_of(versions: &[&str]) -> MigrationLedger {
        let mut ledger = MigrationLedger::new();
        for (i, version) in versions.iter().enumerate() {
            ledger.append(migration(version, &format!("m{}", i + 1))).unwrap();
        }
        ledger
    }

    #[test]
    fn test_append_keeps_application_order() {
        let ledger = ledger_of(&["20250101000000", "20250101000001", "20250102000000"]);
        let versions: Vec<&str> = ledger.list().map(|m| m.version.as_str()).collect();
        assert_eq!(versions, vec!["20250101000000", "20250101000001", "20250102000000"]);

        // list() is restartable
        assert_eq!(ledger.list().count(), 3);
        assert_eq!(ledger.list().count(), 3);
    }

    #[test]
    fn test_append_rejects_stale_or_equal_version() {
        let mut ledger = ledger_of(&["20250101000005"]);

        let err = ledger.append(migration("20250101000005", "dup")).unwrap_err();
        assert!(matches!(err, PlatformError::NonMonotonicVersion { .. }));

        let err = ledger.append(migration("20250101000001", "old")).unwrap_err();
        assert!(matches!(err, PlatformError::NonMonotonicVersion { .. }));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_truncate_keeps_versions_at_or_below_bound() {
        let mut ledger = ledger_of(&["20250101000000", "20250102000000", "20250103000000"]);
        let removed = ledger.truncate_to(Some("20250102000000"));

        assert_eq!(removed, 1);
        assert_eq!(ledger.tail_version().as_deref(), Some("20250102000000"));
    }

    #[test]
    fn test_truncate_between_versions() {
        let mut ledger = ledger_of(&["20250101000000", "20250103000000"]);
        ledger.truncate_to(Some("20250102000000"));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_truncate_sentinel_and_none_clear_everything() {
        let mut ledger = ledger_of(&["20250101000000", "20250102000000"]);
        assert_eq!(ledger.truncate_to(Some(BEFORE_ALL_MIGRATIONS)), 2);
        assert!(ledger.is_empty());

        let mut ledger = ledger_of(&["20250101000000"]);
        assert_eq!(ledger.truncate_to(None), 1);
        assert!(ledger.is_empty());
        assert_eq!(ledger.tail_version(), None);
    }

    #[test]
    fn test_from_migrations_validates_order() {
        let ok = MigrationLedger::from_migrations(vec![
            migration("20250101000000", "a"),
            migration("20250101000001", "b"),
        ]);
        assert!(ok.is_ok());

        let err = MigrationLedger::from_migrations(vec![
            migration("20250101000001", "b"),
            migration("20250101000000", "a"),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            PlatformError::NonMonotonicVersion {
                version: "20250101000000".to_string(),
                tail: "20250101000001".to_string(),
            }
        );
    }

    #[test]
    fn test_replace_with_is_wholesale() {
        let mut target = ledger_of(&["20250101000000", "20250105000000"]);
        let source = ledger_of(&["20250102000000"]);
        target.replace_with(source.clone());
        assert_eq!(target, source);
        assert_eq!(target.summaries()[0].name, "m1");
    }
}
