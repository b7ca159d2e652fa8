//! Migrator - Core migration execution engine

use crate::config::{MigrateConfig, DEFAULT_HISTORY_TABLE};
use crate::migration::{
    BoxError, HistoryStore, Migration, MigrationContext, MigrationDirection, MigrationError,
    MigrationLogger, MigrationRegistry, MigrationStatus, NoopLogger, PendingMigration,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;
#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// Core migration execution engine
///
/// The `Migrator` owns the migration registry, the database handle and the
/// history table name. It computes which migrations are pending from the
/// history table, runs them strictly one after another and records every
/// successful step before starting the next one.
///
/// A migration is applied exactly when the history table holds a record for
/// its version. Pending means "no record for this version", not "above the
/// latest version": a lower version registered after a higher one was applied
/// is still picked up by the next `up`.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use waterline::migration::{MemoryDatabase, Migration, MigrationContext, Migrator};
///
/// # fn main() -> Result<(), waterline::migration::MigrationError> {
/// let mut migrator = Migrator::new();
/// migrator.register(Migration::new(1, "create_users", |_ctx, db: &MemoryDatabase| {
///     db.execute("CREATE TABLE users (id BIGINT PRIMARY KEY)");
///     Ok(())
/// }))?;
/// migrator.set_database(Arc::new(MemoryDatabase::new()));
///
/// let ctx = MigrationContext::new();
/// migrator.up(&ctx, 0)?;
/// assert_eq!(migrator.version(&ctx)?, (1, "create_users".to_string()));
/// # Ok(())
/// # }
/// ```
pub struct Migrator<Db> {
    registry: MigrationRegistry<Db>,
    db: Option<Arc<Db>>,
    history_table: String,
    logger: Arc<dyn MigrationLogger>,
}

impl<Db> Migrator<Db> {
    /// Create a migrator without database, using the default history table
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: MigrationRegistry::new(),
            db: None,
            history_table: DEFAULT_HISTORY_TABLE.to_string(),
            logger: Arc::new(NoopLogger),
        }
    }

    /// Create a migrator for `db` with an initial set of migrations
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::DuplicateVersion` if two migrations share a version.
    pub fn with_migrations(
        db: Arc<Db>,
        migrations: impl IntoIterator<Item = Migration<Db>>,
    ) -> Result<Self, MigrationError> {
        let mut migrator = Self::new();
        migrator.set_database(db);
        for migration in migrations {
            migrator.register(migration)?;
        }
        Ok(migrator)
    }

    /// Register a migration
    ///
    /// Registration does not need a database.
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::DuplicateVersion` if the version is taken.
    pub fn register(&mut self, migration: Migration<Db>) -> Result<(), MigrationError> {
        self.registry.register(migration)
    }

    /// Register a migration identified by `"<version>_<description>[.ext]"`
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Parse` or `MigrationError::DuplicateVersion`.
    pub fn register_source<U, D>(&mut self, identifier: &str, up: U, down: Option<D>) -> Result<(), MigrationError>
    where
        U: Fn(&MigrationContext, &Db) -> Result<(), BoxError> + Send + Sync + 'static,
        D: Fn(&MigrationContext, &Db) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.registry.register_source(identifier, up, down)
    }

    /// Copy of all registered migrations, ascending by version
    #[must_use]
    pub fn registered_migrations(&self) -> Vec<Migration<Db>> {
        self.registry.list()
    }

    pub fn registry(&self) -> &MigrationRegistry<Db> {
        &self.registry
    }

    /// Set the database handle migrations run against
    pub fn set_database(&mut self, db: Arc<Db>) {
        self.db = Some(db);
    }

    pub fn database(&self) -> Option<&Arc<Db>> {
        self.db.as_ref()
    }

    /// Change the history table name; takes effect on the next run
    pub fn set_history_table(&mut self, name: impl Into<String>) {
        self.history_table = name.into();
    }

    pub fn history_table(&self) -> &str {
        &self.history_table
    }

    pub fn set_logger(&mut self, logger: Arc<dyn MigrationLogger>) {
        self.logger = logger;
    }

    /// Apply settings from a loaded [`MigrateConfig`]
    pub fn configure(&mut self, config: &MigrateConfig) {
        self.set_history_table(config.history_table.clone());
    }

    fn require_database(&self) -> Result<&Db, MigrationError> {
        self.db.as_deref().ok_or(MigrationError::NotConfigured)
    }
}

impl<Db: HistoryStore> Migrator<Db> {
    /// Current database version and its description
    ///
    /// Returns `(0, "")` when no migration has been applied.
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::NotConfigured` without database and
    /// `MigrationError::History` if the history table cannot be read.
    pub fn version(&self, _ctx: &MigrationContext) -> Result<(u64, String), MigrationError> {
        let db = self.require_database()?;
        db.ensure_history(&self.history_table)?;

        Ok(db
            .latest_version(&self.history_table)?
            .map(|record| (record.version, record.description))
            .unwrap_or_default())
    }

    /// Applied and pending migrations
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::NotConfigured` without database and
    /// `MigrationError::History` if the history table cannot be read.
    pub fn status(&self, _ctx: &MigrationContext) -> Result<MigrationStatus, MigrationError> {
        let db = self.require_database()?;
        db.ensure_history(&self.history_table)?;

        let applied = db.applied_records(&self.history_table)?;
        let applied_versions: HashSet<u64> = applied.iter().map(|record| record.version).collect();

        let pending = self
            .registry
            .iter()
            .filter(|migration| !applied_versions.contains(&migration.version()))
            .map(|migration| PendingMigration {
                version: migration.version(),
                description: migration.description().to_string(),
                reversible: migration.is_reversible(),
            })
            .collect();

        Ok(MigrationStatus::new(applied, pending))
    }

    /// Apply pending migrations in ascending version order
    ///
    /// At most `n` migrations are applied; `n <= 0` applies everything pending.
    /// The run stops at the first failing migration. Migrations applied before
    /// the failure stay applied and recorded.
    ///
    /// # Errors
    ///
    /// - `NotConfigured` without database
    /// - `Cancelled` / `DeadlineExceeded` if `ctx` stops the run between steps
    /// - `MigrationFailed` if an up function fails
    /// - `HistoryWrite` if a successful migration cannot be recorded, or if the
    ///   store refuses the version before the up function runs
    /// - `History` if the history table cannot be read
    pub fn up(&self, ctx: &MigrationContext, n: isize) -> Result<(), MigrationError> {
        let db = self.require_database()?;
        db.ensure_history(&self.history_table)?;

        let applied: HashSet<u64> = db.applied_versions(&self.history_table)?.into_iter().collect();
        let pending: Vec<&Migration<Db>> = self
            .registry
            .iter()
            .filter(|migration| !applied.contains(&migration.version()))
            .take(step_limit(n))
            .collect();

        log::debug!(
            "{} pending migration(s) selected (n = {n}, history table '{}')",
            pending.len(),
            self.history_table
        );

        for migration in &pending {
            self.run_step(ctx, db, migration, MigrationDirection::Up)?;
        }

        if !pending.is_empty() {
            log::info!("Applied {} migration(s)", pending.len());
        }
        Ok(())
    }

    /// Revert applied migrations in descending version order
    ///
    /// At most `n` migrations are reverted; `n <= 0` reverts everything
    /// applied. The run stops at the first failure without re-applying what
    /// was already reverted.
    ///
    /// # Errors
    ///
    /// - `NotConfigured` without database
    /// - `Cancelled` / `DeadlineExceeded` if `ctx` stops the run between steps
    /// - `UnregisteredVersion` if the history names an unknown version
    /// - `NoDownMigration` if a migration has no down function; its record is kept
    /// - `MigrationFailed` if a down function fails
    /// - `HistoryWrite` if a reverted migration cannot be removed from the history
    /// - `History` if the history table cannot be read
    pub fn down(&self, ctx: &MigrationContext, n: isize) -> Result<(), MigrationError> {
        let db = self.require_database()?;
        db.ensure_history(&self.history_table)?;

        let mut applied = db.applied_versions(&self.history_table)?;
        applied.sort_unstable_by(|a, b| b.cmp(a));
        applied.truncate(step_limit(n));

        log::debug!(
            "{} applied migration(s) selected for rollback (n = {n}, history table '{}')",
            applied.len(),
            self.history_table
        );

        for &version in &applied {
            let migration = self
                .registry
                .get(version)
                .ok_or(MigrationError::UnregisteredVersion { version })?;
            self.run_step(ctx, db, migration, MigrationDirection::Down)?;
        }

        if !applied.is_empty() {
            log::info!("Reverted {} migration(s)", applied.len());
        }
        Ok(())
    }

    /// Run one migration and update the history table
    fn run_step(
        &self,
        ctx: &MigrationContext,
        db: &Db,
        migration: &Migration<Db>,
        direction: MigrationDirection,
    ) -> Result<(), MigrationError> {
        let version = migration.version();
        ctx.check(version)?;

        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::migration_span(direction, version, migration.description()).entered();

        if direction == MigrationDirection::Up {
            db.check_version(version)
                .map_err(|source| MigrationError::HistoryWrite { version, source })?;
        }

        let start = Instant::now();
        if let Err(error) = migration.run(direction, ctx, db) {
            log::warn!("Migration {version} ({direction}) failed: {error}");
            #[cfg(feature = "metrics")]
            METRICS.record_failure(direction);
            return Err(error);
        }

        let recorded = match direction {
            MigrationDirection::Up => {
                db.record_applied(&self.history_table, version, migration.description())
            }
            MigrationDirection::Down => db.record_reverted(&self.history_table, version),
        };
        if let Err(source) = recorded {
            log::warn!(
                "Migration {version} ({direction}) succeeded but the history table was not updated: {source}"
            );
            #[cfg(feature = "metrics")]
            METRICS.record_failure(direction);
            return Err(MigrationError::HistoryWrite { version, source });
        }

        let elapsed = start.elapsed();
        #[cfg(feature = "metrics")]
        METRICS.record_success(direction, elapsed);

        let message = match direction {
            MigrationDirection::Up => "applied migration",
            MigrationDirection::Down => "reverted migration",
        };
        let fields = [
            ("version", version.to_string()),
            ("description", migration.description().to_string()),
            ("elapsed_ms", elapsed.as_millis().to_string()),
        ];
        if let Err(error) = self.logger.info(message, &fields) {
            log::debug!("Migration logger failed: {error}");
        }

        Ok(())
    }
}

// Manual impl: deriving would require `Db: Clone`.
impl<Db> Clone for Migrator<Db> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            db: self.db.clone(),
            history_table: self.history_table.clone(),
            logger: Arc::clone(&self.logger),
        }
    }
}

impl<Db> Default for Migrator<Db> {
    fn default() -> Self {
        Self::new()
    }
}

/// Number of steps to take for a caller-supplied `n`; `n <= 0` means no limit
fn step_limit(n: isize) -> usize {
    usize::try_from(n).ok().filter(|&n| n > 0).unwrap_or(usize::MAX)
}
