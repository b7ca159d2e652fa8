//! Migration history table on PostgreSQL
//!
//! Implements [`HistoryStore`] for `may_postgres::Client`. The table holds one
//! row per applied migration, keyed by version:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS "migrations" (
//!     version BIGINT PRIMARY KEY,
//!     description TEXT NOT NULL,
//!     applied_at TIMESTAMPTZ NOT NULL DEFAULT now()
//! )
//! ```
//!
//! The primary key doubles as the optimistic-write guard: a second insert for
//! the same version fails instead of silently re-applying a migration.

use super::history::{HistoryError, HistoryStore};
use super::record::MigrationRecord;
use chrono::DateTime;
use may_postgres::{Client, Row};

/// `CREATE TABLE IF NOT EXISTS` statement for the history table
pub fn create_state_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (
            version BIGINT PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
        quote_ident(table)
    )
}

/// Quote a table name as a PostgreSQL identifier
///
/// Identifiers cannot be bound as parameters, so the configured name is quoted
/// with embedded double quotes doubled.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn to_db_version(version: u64) -> Result<i64, HistoryError> {
    i64::try_from(version).map_err(|_| HistoryError::VersionOutOfRange { version })
}

fn record_from_row(row: &Row) -> Result<MigrationRecord, HistoryError> {
    let version: i64 = row.get(0);
    let description: String = row.get(1);
    let applied_at_ms: i64 = row.get(2);

    let version = u64::try_from(version)
        .map_err(|_| HistoryError::Backend(format!("negative version {version} in history table")))?;
    let applied_at = DateTime::from_timestamp_millis(applied_at_ms)
        .ok_or_else(|| HistoryError::Backend(format!("invalid applied_at {applied_at_ms} for version {version}")))?;

    Ok(MigrationRecord::new(version, description, applied_at))
}

fn select_records_sql(table: &str, suffix: &str) -> String {
    format!(
        "SELECT version, description, (EXTRACT(EPOCH FROM applied_at) * 1000)::BIGINT
         FROM {} {}",
        quote_ident(table),
        suffix
    )
}

impl HistoryStore for Client {
    fn ensure_history(&self, table: &str) -> Result<(), HistoryError> {
        self.execute(create_state_table_sql(table).as_str(), &[])?;
        Ok(())
    }

    fn applied_records(&self, table: &str) -> Result<Vec<MigrationRecord>, HistoryError> {
        let sql = select_records_sql(table, "ORDER BY version ASC");
        self.query(sql.as_str(), &[])?
            .iter()
            .map(record_from_row)
            .collect()
    }

    fn applied_versions(&self, table: &str) -> Result<Vec<u64>, HistoryError> {
        let sql = format!("SELECT version FROM {} ORDER BY version ASC", quote_ident(table));
        self.query(sql.as_str(), &[])?
            .iter()
            .map(|row| {
                let version: i64 = row.get(0);
                u64::try_from(version)
                    .map_err(|_| HistoryError::Backend(format!("negative version {version} in history table")))
            })
            .collect()
    }

    fn latest_version(&self, table: &str) -> Result<Option<MigrationRecord>, HistoryError> {
        let sql = select_records_sql(table, "ORDER BY version DESC LIMIT 1");
        let rows = self.query(sql.as_str(), &[])?;
        rows.first().map(record_from_row).transpose()
    }

    fn is_applied(&self, table: &str, version: u64) -> Result<bool, HistoryError> {
        let db_version = to_db_version(version)?;
        let sql = format!("SELECT 1 FROM {} WHERE version = $1", quote_ident(table));
        let rows = self.query(sql.as_str(), &[&db_version])?;
        Ok(!rows.is_empty())
    }

    fn check_version(&self, version: u64) -> Result<(), HistoryError> {
        to_db_version(version).map(|_| ())
    }

    fn record_applied(&self, table: &str, version: u64, description: &str) -> Result<(), HistoryError> {
        let db_version = to_db_version(version)?;
        let sql = format!(
            "INSERT INTO {} (version, description, applied_at) VALUES ($1, $2, now())
             ON CONFLICT (version) DO NOTHING",
            quote_ident(table)
        );
        let inserted = self.execute(sql.as_str(), &[&db_version, &description])?;
        if inserted == 0 {
            return Err(HistoryError::AlreadyRecorded { version });
        }
        Ok(())
    }

    fn record_reverted(&self, table: &str, version: u64) -> Result<(), HistoryError> {
        let db_version = to_db_version(version)?;
        let sql = format!("DELETE FROM {} WHERE version = $1", quote_ident(table));
        let deleted = self.execute(sql.as_str(), &[&db_version])?;
        if deleted == 0 {
            return Err(HistoryError::NotRecorded { version });
        }
        Ok(())
    }
}
