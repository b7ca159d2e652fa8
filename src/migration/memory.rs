//! In-process database handle with an in-memory history table
//!
//! Useful for embedding, dry runs and tests. Statements passed to
//! [`MemoryDatabase::execute`] are only logged, never interpreted.

use super::history::{HistoryError, HistoryStore};
use super::record::MigrationRecord;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

type Tables = HashMap<String, BTreeMap<u64, MigrationRecord>>;

#[derive(Debug, Default)]
pub struct MemoryDatabase {
    history: Mutex<Tables>,
    statements: Mutex<Vec<String>>,
}

impl MemoryDatabase {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a statement to the execution log
    pub fn execute(&self, statement: impl Into<String>) {
        lock(&self.statements).push(statement.into());
    }

    /// Statements executed so far, in order
    #[must_use]
    pub fn statements(&self) -> Vec<String> {
        lock(&self.statements).clone()
    }

    /// Names of history tables that have been created
    #[must_use]
    pub fn history_tables(&self) -> Vec<String> {
        let mut names: Vec<String> = lock(&self.history).keys().cloned().collect();
        names.sort();
        names
    }

    fn with_table<T>(
        &self,
        table: &str,
        f: impl FnOnce(&mut BTreeMap<u64, MigrationRecord>) -> Result<T, HistoryError>,
    ) -> Result<T, HistoryError> {
        let mut tables = lock(&self.history);
        let records = tables
            .get_mut(table)
            .ok_or_else(|| HistoryError::Backend(format!("history table '{table}' does not exist")))?;
        f(records)
    }
}

// A panic while holding the lock leaves the maps in a consistent state
// (every mutation is a single insert/remove), so poisoning is ignored.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl HistoryStore for MemoryDatabase {
    fn ensure_history(&self, table: &str) -> Result<(), HistoryError> {
        lock(&self.history).entry(table.to_string()).or_default();
        Ok(())
    }

    fn applied_records(&self, table: &str) -> Result<Vec<MigrationRecord>, HistoryError> {
        self.with_table(table, |records| Ok(records.values().cloned().collect()))
    }

    fn latest_version(&self, table: &str) -> Result<Option<MigrationRecord>, HistoryError> {
        self.with_table(table, |records| {
            Ok(records.last_key_value().map(|(_, record)| record.clone()))
        })
    }

    fn is_applied(&self, table: &str, version: u64) -> Result<bool, HistoryError> {
        self.with_table(table, |records| Ok(records.contains_key(&version)))
    }

    fn record_applied(&self, table: &str, version: u64, description: &str) -> Result<(), HistoryError> {
        self.with_table(table, |records| {
            if records.contains_key(&version) {
                return Err(HistoryError::AlreadyRecorded { version });
            }
            records.insert(version, MigrationRecord::applied_now(version, description));
            Ok(())
        })
    }

    fn record_reverted(&self, table: &str, version: u64) -> Result<(), HistoryError> {
        self.with_table(table, |records| {
            records
                .remove(&version)
                .map(|_| ())
                .ok_or(HistoryError::NotRecorded { version })
        })
    }
}
