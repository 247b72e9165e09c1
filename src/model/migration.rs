use chrono::{Duration, NaiveDateTime, Timelike, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// `YYYYMMDDHHMMSS`, fixed width so lexicographic order equals chronological order
pub const VERSION_FORMAT: &str = "%Y%m%d%H%M%S";

/// Reset bound that sorts before every real version, clearing the ledger
pub const BEFORE_ALL_MIGRATIONS: &str = "0";

/// A named, versioned SQL change unit. Immutable once applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Migration {
    pub version: String,
    pub name: String,
    pub query: String,
}

/// Externally visible projection of a migration; the query text is withheld
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationSummary {
    pub version: String,
    pub name: String,
}

impl From<&Migration> for MigrationSummary {
    fn from(migration: &Migration) -> Self {
        Self {
            version: migration.version.clone(),
            name: migration.name.clone(),
        }
    }
}

/// Result of merge / reset / rebase: the last migration now applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationVersion {
    pub migration_version: Option<String>,
}

/// Issues migration versions from wall-clock time.
///
/// Two stamps taken within the same second would collide, so every stamp is
/// pushed at least one second past both the previously issued stamp and the
/// caller's floor (normally the target ledger's tail).
#[derive(Debug, Default)]
pub struct VersionClock {
    last: Mutex<Option<NaiveDateTime>>,
}

impl VersionClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_after(&self, floor: Option<&str>) -> String {
        let now = Utc::now().naive_utc();
        let now = now.with_nanosecond(0).unwrap_or(now);

        let mut last = self.last.lock();
        let mut candidate = now;
        if let Some(previous) = *last {
            candidate = candidate.max(previous + Duration::seconds(1));
        }
        if let Some(floor) = floor.and_then(parse_version) {
            candidate = candidate.max(floor + Duration::seconds(1));
        }
        *last = Some(candidate);

        candidate.format(VERSION_FORMAT).to_string()
    }
}

pub fn parse_version(version: &str) -> Option<NaiveDateTime> {
    if version.len() != 14 {
        return None;
    }
    NaiveDateTime::parse_from_str(version, VERSION_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versions_are_fixed_width_timestamps() {
        let clock = VersionClock::new();
        let version = clock.next_after(None);

        assert_eq!(version.len(), 14);
        assert!(version.chars().all(|c| c.is_ascii_digit()));
        assert!(parse_version(&version).is_some());
    }

    #[test]
    fn test_rapid_calls_stay_strictly_increasing() {
        let clock = VersionClock::new();
        let versions: Vec<String> = (0..50).map(|_| clock.next_after(None)).collect();

        for pair in versions.windows(2) {
            assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_floor_in_the_future_is_respected() {
        let clock = VersionClock::new();
        let version = clock.next_after(Some("29991231235958"));
        assert_eq!(version, "29991231235959");

        // Later stamps keep climbing past the floor
        assert_eq!(clock.next_after(None), "30000101000000");
    }

    #[test]
    fn test_unparseable_floor_is_ignored() {
        let clock = VersionClock::new();
        let version = clock.next_after(Some(BEFORE_ALL_MIGRATIONS));
        assert!(version.as_str() > BEFORE_ALL_MIGRATIONS);
    }

    #[test]
    fn test_summary_withholds_query() {
        let migration = Migration {
            version: "20250101000000".to_string(),
            name: "create_users".to_string(),
            query: "create table users(id int)".to_string(),
        };
        let json = serde_json::to_value(MigrationSummary::from(&migration)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"version": "20250101000000", "name": "create_users"})
        );
    }
}
