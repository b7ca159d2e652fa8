//! Migration status tracking

use crate::migration::MigrationRecord;

/// Migration status information
#[derive(Debug, Clone)]
pub struct MigrationStatus {
    /// Applied migrations (from the history table), ascending
    pub applied: Vec<MigrationRecord>,

    /// Pending migrations (registered but not applied), ascending
    pub pending: Vec<PendingMigration>,

    /// Total number of migrations (applied + pending)
    pub total: usize,

    /// Number of applied migrations
    pub applied_count: usize,

    /// Number of pending migrations
    pub pending_count: usize,
}

/// Represents a pending migration (not yet applied)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMigration {
    /// Migration version
    pub version: u64,

    /// Migration description
    pub description: String,

    /// Whether a down function is registered
    pub reversible: bool,
}

impl MigrationStatus {
    /// Create a new `MigrationStatus`
    #[must_use]
    pub fn new(applied: Vec<MigrationRecord>, pending: Vec<PendingMigration>) -> Self {
        let applied_count = applied.len();
        let pending_count = pending.len();
        let total = applied_count + pending_count;

        Self {
            applied,
            pending,
            total,
            applied_count,
            pending_count,
        }
    }

    /// Check if all migrations are applied
    #[must_use]
    pub fn is_up_to_date(&self) -> bool {
        self.pending_count == 0
    }

    /// Get the latest applied migration version
    #[must_use]
    pub fn latest_applied_version(&self) -> Option<u64> {
        self.applied.iter().map(|m| m.version).max()
    }

    /// Get the next pending migration version
    #[must_use]
    pub fn next_pending_version(&self) -> Option<u64> {
        self.pending.first().map(|m| m.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(version: u64) -> PendingMigration {
        PendingMigration {
            version,
            description: format!("migration_{version}"),
            reversible: true,
        }
    }

    #[test]
    fn test_status_counts() {
        let applied = vec![
            MigrationRecord::applied_now(1, "first"),
            MigrationRecord::applied_now(2, "second"),
        ];
        let status = MigrationStatus::new(applied, vec![pending(3), pending(4)]);

        assert_eq!(status.total, 4);
        assert_eq!(status.applied_count, 2);
        assert_eq!(status.pending_count, 2);
        assert!(!status.is_up_to_date());
        assert_eq!(status.latest_applied_version(), Some(2));
        assert_eq!(status.next_pending_version(), Some(3));
    }

    #[test]
    fn test_empty_status_is_up_to_date() {
        let status = MigrationStatus::new(Vec::new(), Vec::new());
        assert!(status.is_up_to_date());
        assert_eq!(status.latest_applied_version(), None);
        assert_eq!(status.next_pending_version(), None);
    }
}
