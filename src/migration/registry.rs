//! Migration registry

use super::file::parse_identifier;
use super::migration::Migration;
use super::{BoxError, MigrationContext, MigrationError};

/// Ordered collection of registered migrations
///
/// Migrations are kept sorted ascending by version and each version appears at
/// most once. The registry only grows; registration is expected to finish
/// before the first migration run.
pub struct MigrationRegistry<Db> {
    migrations: Vec<Migration<Db>>,
}

impl<Db> MigrationRegistry<Db> {
    #[must_use]
    pub fn new() -> Self {
        Self { migrations: Vec::new() }
    }

    /// Register a migration
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::DuplicateVersion` if a migration with the same
    /// version is already registered. The registry is unchanged in that case.
    pub fn register(&mut self, migration: Migration<Db>) -> Result<(), MigrationError> {
        match self
            .migrations
            .binary_search_by_key(&migration.version(), Migration::version)
        {
            Ok(existing) => Err(MigrationError::DuplicateVersion {
                version: migration.version(),
                description: self.migrations[existing].description().to_string(),
            }),
            Err(position) => {
                log::debug!(
                    "Registered migration {} ({})",
                    migration.version(),
                    migration.description()
                );
                self.migrations.insert(position, migration);
                Ok(())
            }
        }
    }

    /// Register a migration whose version and description come from `identifier`
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Parse` for a malformed identifier and
    /// `MigrationError::DuplicateVersion` for a version clash.
    pub fn register_source<U, D>(&mut self, identifier: &str, up: U, down: Option<D>) -> Result<(), MigrationError>
    where
        U: Fn(&MigrationContext, &Db) -> Result<(), BoxError> + Send + Sync + 'static,
        D: Fn(&MigrationContext, &Db) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let (version, description) = parse_identifier(identifier)?;
        let migration = Migration::new(version, description, up);
        let migration = match down {
            Some(down) => migration.with_down(down),
            None => migration,
        };
        self.register(migration)
    }

    /// Snapshot of all migrations, ascending by version
    #[must_use]
    pub fn list(&self) -> Vec<Migration<Db>> {
        self.migrations.clone()
    }

    /// Iterate ascending without copying
    pub fn iter(&self) -> std::slice::Iter<'_, Migration<Db>> {
        self.migrations.iter()
    }

    #[must_use]
    pub fn get(&self, version: u64) -> Option<&Migration<Db>> {
        self.migrations
            .binary_search_by_key(&version, Migration::version)
            .ok()
            .map(|idx| &self.migrations[idx])
    }

    #[must_use]
    pub fn is_registered(&self, version: u64) -> bool {
        self.get(version).is_some()
    }

    /// Registered versions, ascending
    #[must_use]
    pub fn versions(&self) -> Vec<u64> {
        self.migrations.iter().map(Migration::version).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }
}

impl<Db> Default for MigrationRegistry<Db> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Db> Clone for MigrationRegistry<Db> {
    fn clone(&self) -> Self {
        Self { migrations: self.migrations.clone() }
    }
}

impl<Db> std::fmt::Debug for MigrationRegistry<Db> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.migrations.iter()).finish()
    }
}
