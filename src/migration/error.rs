//! Migration-specific error types

use crate::migration::history::HistoryError;
use crate::migration::BoxError;

/// Migration-specific errors
///
/// Registration errors (`Parse`, `DuplicateVersion`) leave the registry untouched.
/// Execution errors stop the current batch at the first failure; migrations applied
/// earlier in the same batch stay applied, so callers should inspect
/// [`Migrator::version`](crate::migration::Migrator::version) before retrying.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// Identifier does not follow `<version>_<description>[.ext]`
    #[error("Invalid migration identifier '{identifier}': {reason}")]
    Parse { identifier: String, reason: String },

    /// Another migration already uses this version
    #[error("Migration with version {version} already registered ('{description}')")]
    DuplicateVersion { version: u64, description: String },

    /// `up`/`down`/`version` called before a database was set
    #[error("No database configured for migrations")]
    NotConfigured,

    /// The migration function itself returned an error
    #[error("Migration '{description}' (version {version}) failed: {source}")]
    MigrationFailed {
        version: u64,
        description: String,
        #[source]
        source: BoxError,
    },

    /// A down migration was requested for an irreversible migration
    #[error("Migration version {version} has no down migration")]
    NoDownMigration { version: u64 },

    /// The migration ran but its history record could not be written or removed.
    /// Database state and history may disagree after this error.
    #[error("History update for version {version} failed: {source}")]
    HistoryWrite {
        version: u64,
        #[source]
        source: HistoryError,
    },

    /// Reading or preparing the history table failed
    #[error("History error: {0}")]
    History(#[from] HistoryError),

    /// History holds a version that no registered migration provides
    #[error("Applied migration version {version} is not registered")]
    UnregisteredVersion { version: u64 },

    /// The caller cancelled the context before `version` started
    #[error("Migration run cancelled before version {version}")]
    Cancelled { version: u64 },

    /// The context deadline passed before `version` started
    #[error("Migration deadline exceeded before version {version}")]
    DeadlineExceeded { version: u64 },

    /// The shared migrator lock was poisoned by a panicking migration
    #[error("Failed to lock migrator: {0}")]
    LockPoisoned(String),
}

impl MigrationError {
    /// Version of the migration this error is about, if any
    #[must_use]
    pub fn version(&self) -> Option<u64> {
        match self {
            MigrationError::DuplicateVersion { version, .. }
            | MigrationError::MigrationFailed { version, .. }
            | MigrationError::NoDownMigration { version }
            | MigrationError::HistoryWrite { version, .. }
            | MigrationError::UnregisteredVersion { version }
            | MigrationError::Cancelled { version }
            | MigrationError::DeadlineExceeded { version } => Some(*version),
            MigrationError::Parse { .. }
            | MigrationError::NotConfigured
            | MigrationError::History(_)
            | MigrationError::LockPoisoned(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_failed_display_names_version() {
        let err = MigrationError::MigrationFailed {
            version: 2,
            description: "add_index".to_string(),
            source: "boom".into(),
        };
        let display = err.to_string();
        assert!(display.contains("version 2"));
        assert!(display.contains("add_index"));
        assert!(display.contains("boom"));
        assert_eq!(err.version(), Some(2));
    }

    #[test]
    fn test_migration_failed_keeps_source() {
        use std::error::Error;

        let err = MigrationError::MigrationFailed {
            version: 7,
            description: "seed".to_string(),
            source: "constraint violated".into(),
        };
        let source = err.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("constraint violated"));
    }

    #[test]
    fn test_history_write_wraps_history_error() {
        let err = MigrationError::HistoryWrite {
            version: 3,
            source: HistoryError::AlreadyRecorded { version: 3 },
        };
        assert!(err.to_string().contains("version 3"));
        assert_eq!(err.version(), Some(3));
    }

    #[test]
    fn test_errors_without_version() {
        assert_eq!(MigrationError::NotConfigured.version(), None);
        let parse = MigrationError::Parse {
            identifier: "x".to_string(),
            reason: "no version".to_string(),
        };
        assert_eq!(parse.version(), None);
        assert!(parse.to_string().contains("'x'"));
    }
}
