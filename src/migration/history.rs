//! History store interface
//!
//! The history table is the ledger of applied migrations. The engine never
//! keeps its own copy: every `up`, `down` and `version` call reads it again.

use super::record::MigrationRecord;

/// Errors raised by a [`HistoryStore`]
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// A record for this version already exists (another run got there first)
    #[error("Version {version} is already recorded as applied")]
    AlreadyRecorded { version: u64 },

    /// No record exists for this version
    #[error("Version {version} is not recorded as applied")]
    NotRecorded { version: u64 },

    /// The backend cannot store this version
    #[error("Version {version} is out of range for the history table")]
    VersionOutOfRange { version: u64 },

    /// PostgreSQL error from `may_postgres`
    #[cfg(feature = "postgres")]
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] may_postgres::Error),

    /// Other backend failure
    #[error("History backend error: {0}")]
    Backend(String),
}

/// Persistence surface for applied-migration records
///
/// Implemented by the database handle the migrations run against, so the
/// history lives next to the schema it describes. The table name is passed on
/// every call; it belongs to the [`Migrator`](crate::migration::Migrator)
/// configuration, not to the store.
///
/// Every method must be atomic for a single version. `record_applied` must
/// refuse a version that is already recorded: that refusal is the only guard
/// against two processes applying the same migration.
///
/// Only `ensure_history`, `applied_records`, `record_applied` and
/// `record_reverted` are required; the queries have default implementations
/// on top of `applied_records`.
pub trait HistoryStore {
    /// Create the history table if it does not exist
    fn ensure_history(&self, table: &str) -> Result<(), HistoryError>;

    /// All records, ascending by version
    fn applied_records(&self, table: &str) -> Result<Vec<MigrationRecord>, HistoryError>;

    /// Applied versions, ascending
    fn applied_versions(&self, table: &str) -> Result<Vec<u64>, HistoryError> {
        Ok(self
            .applied_records(table)?
            .into_iter()
            .map(|record| record.version)
            .collect())
    }

    /// Record with the highest version, `None` when nothing is applied
    fn latest_version(&self, table: &str) -> Result<Option<MigrationRecord>, HistoryError> {
        Ok(self
            .applied_records(table)?
            .into_iter()
            .max_by_key(|record| record.version))
    }

    fn is_applied(&self, table: &str, version: u64) -> Result<bool, HistoryError> {
        Ok(self.applied_versions(table)?.contains(&version))
    }

    /// Whether `version` can be recorded at all
    ///
    /// Called before an up function runs, so a version the backend cannot
    /// store is refused before the database is changed.
    fn check_version(&self, _version: u64) -> Result<(), HistoryError> {
        Ok(())
    }

    /// Insert the record for `version`
    fn record_applied(&self, table: &str, version: u64, description: &str) -> Result<(), HistoryError>;

    /// Delete the record for `version`
    fn record_reverted(&self, table: &str, version: u64) -> Result<(), HistoryError>;
}
