//! `MigrationRecord` - Represents entries in the migration history table

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One applied migration, as stored in the history table
///
/// A record for version `V` exists exactly when migration `V` is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    /// Migration version
    pub version: u64,

    /// Human-readable migration description
    pub description: String,

    /// When the migration was applied
    pub applied_at: DateTime<Utc>,
}

impl MigrationRecord {
    /// Create a new `MigrationRecord`
    #[must_use]
    pub fn new(version: u64, description: impl Into<String>, applied_at: DateTime<Utc>) -> Self {
        Self {
            version,
            description: description.into(),
            applied_at,
        }
    }

    /// Record stamped with the current time
    #[must_use]
    pub fn applied_now(version: u64, description: impl Into<String>) -> Self {
        Self::new(version, description, Utc::now())
    }
}
