//! Process-wide migrator
//!
//! Most code should own a [`Migrator`] and pass it around. Applications that
//! register migrations from many modules at startup can instead declare one
//! shared instance with [`global_migrator!`](crate::global_migrator) and add
//! migrations with [`register!`](crate::register) from files named
//! `<version>_<description>.rs`:
//!
//! ```rust
//! use std::sync::Arc;
//! use waterline::migration::{MemoryDatabase, MigrationContext};
//! use waterline::global_migrator;
//!
//! global_migrator! {
//!     static MIGRATOR: MemoryDatabase;
//! }
//!
//! fn create_users(_ctx: &MigrationContext, db: &MemoryDatabase) -> Result<(), waterline::migration::BoxError> {
//!     db.execute("CREATE TABLE users (id BIGINT PRIMARY KEY)");
//!     Ok(())
//! }
//!
//! # fn main() -> Result<(), waterline::migration::MigrationError> {
//! let migration = waterline::migration::Migration::new(1, "create_users", create_users);
//! MIGRATOR.register(migration)?;
//! MIGRATOR.set_database(Arc::new(MemoryDatabase::new()))?;
//! MIGRATOR.up(&MigrationContext::new(), 0)?;
//! assert_eq!(MIGRATOR.version(&MigrationContext::new())?.0, 1);
//! # Ok(())
//! # }
//! ```

use crate::config::MigrateConfig;
use crate::migration::{
    HistoryStore, Migration, MigrationContext, MigrationError, MigrationLogger, MigrationStatus,
    Migrator,
};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A [`Migrator`] behind a lock, usable from a `static`
///
/// Registration and configuration take the write lock. Runs copy the
/// migrator under the read lock and release it before any migration function
/// is called. A panic while the lock is held poisons it and every later call
/// fails with `MigrationError::LockPoisoned`.
pub struct GlobalMigrator<Db> {
    inner: RwLock<Migrator<Db>>,
}

impl<Db> GlobalMigrator<Db> {
    #[must_use]
    pub fn new() -> Self {
        Self::from_migrator(Migrator::new())
    }

    #[must_use]
    pub fn from_migrator(migrator: Migrator<Db>) -> Self {
        Self {
            inner: RwLock::new(migrator),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Migrator<Db>>, MigrationError> {
        self.inner
            .read()
            .map_err(|e| MigrationError::LockPoisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Migrator<Db>>, MigrationError> {
        self.inner
            .write()
            .map_err(|e| MigrationError::LockPoisoned(e.to_string()))
    }

    /// Register a migration
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::DuplicateVersion` or `MigrationError::LockPoisoned`.
    pub fn register(&self, migration: Migration<Db>) -> Result<(), MigrationError> {
        self.write()?.register(migration)
    }

    /// Register a migration, panicking on failure
    ///
    /// Meant for startup code where a broken migration set is a programming
    /// error.
    ///
    /// # Panics
    ///
    /// Panics if the version is already registered or the lock is poisoned.
    pub fn must_register(&self, migration: Migration<Db>) {
        if let Err(err) = self.register(migration) {
            panic!("failed to register migration: {err}");
        }
    }

    /// Copy of all registered migrations, ascending by version
    pub fn registered_migrations(&self) -> Result<Vec<Migration<Db>>, MigrationError> {
        Ok(self.read()?.registered_migrations())
    }

    pub fn set_database(&self, db: Arc<Db>) -> Result<(), MigrationError> {
        self.write()?.set_database(db);
        Ok(())
    }

    pub fn set_history_table(&self, name: impl Into<String>) -> Result<(), MigrationError> {
        self.write()?.set_history_table(name);
        Ok(())
    }

    pub fn history_table(&self) -> Result<String, MigrationError> {
        Ok(self.read()?.history_table().to_string())
    }

    pub fn set_logger(&self, logger: Arc<dyn MigrationLogger>) -> Result<(), MigrationError> {
        self.write()?.set_logger(logger);
        Ok(())
    }

    pub fn configure(&self, config: &MigrateConfig) -> Result<(), MigrationError> {
        self.write()?.configure(config);
        Ok(())
    }
}

impl<Db: HistoryStore> GlobalMigrator<Db> {
    /// Copy of the current migrator, taken under a short read lock
    ///
    /// Runs use the copy, so migration functions may call back into the
    /// facade (including `register` and the setters) without deadlocking.
    /// Changes made during a run apply to the next run.
    fn snapshot(&self) -> Result<Migrator<Db>, MigrationError> {
        Ok(self.read()?.clone())
    }

    /// See [`Migrator::up`]
    pub fn up(&self, ctx: &MigrationContext, n: isize) -> Result<(), MigrationError> {
        self.snapshot()?.up(ctx, n)
    }

    /// See [`Migrator::down`]
    pub fn down(&self, ctx: &MigrationContext, n: isize) -> Result<(), MigrationError> {
        self.snapshot()?.down(ctx, n)
    }

    /// See [`Migrator::version`]
    pub fn version(&self, ctx: &MigrationContext) -> Result<(u64, String), MigrationError> {
        self.snapshot()?.version(ctx)
    }

    pub fn status(&self, ctx: &MigrationContext) -> Result<MigrationStatus, MigrationError> {
        self.snapshot()?.status(ctx)
    }
}

impl<Db> Default for GlobalMigrator<Db> {
    fn default() -> Self {
        Self::new()
    }
}

/// Declare a process-wide [`GlobalMigrator`]
///
/// ```rust
/// use waterline::migration::MemoryDatabase;
///
/// waterline::global_migrator! {
///     pub static MIGRATOR: MemoryDatabase;
/// }
///
/// assert!(MIGRATOR.registered_migrations().map(|m| m.is_empty()).unwrap_or(false));
/// ```
#[macro_export]
macro_rules! global_migrator {
    ($(#[$meta:meta])* $vis:vis static $name:ident : $db:ty;) => {
        $(#[$meta])*
        $vis static $name: $crate::__private::Lazy<$crate::migration::GlobalMigrator<$db>> =
            $crate::__private::Lazy::new($crate::migration::GlobalMigrator::new);
    };
}

/// Build a [`Migration`](crate::migration::Migration) named after the
/// calling source file
///
/// The file must be named `<version>_<description>.rs`. Evaluates to
/// `Result<Migration<Db>, MigrationError>`.
#[macro_export]
macro_rules! migration {
    ($up:expr $(,)?) => {
        $crate::migration::Migration::from_source(::core::file!(), $up)
    };
    ($up:expr, $down:expr $(,)?) => {
        match $crate::migration::Migration::from_source(::core::file!(), $up) {
            ::core::result::Result::Ok(migration) => ::core::result::Result::Ok(migration.with_down($down)),
            ::core::result::Result::Err(err) => ::core::result::Result::Err(err),
        }
    };
}

/// Register a migration named after the calling source file
///
/// `target` is a `Migrator` or a `GlobalMigrator`. Evaluates to
/// `Result<(), MigrationError>`.
///
/// ```rust,ignore
/// // migrations/3_add_orders.rs
/// waterline::register!(MIGRATOR, add_orders_up, add_orders_down)?;
/// ```
#[macro_export]
macro_rules! register {
    ($target:expr, $up:expr $(, $down:expr)? $(,)?) => {
        match $crate::migration!($up $(, $down)?) {
            ::core::result::Result::Ok(migration) => $target.register(migration),
            ::core::result::Result::Err(err) => ::core::result::Result::Err(err),
        }
    };
}
