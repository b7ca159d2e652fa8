//! Migration definition

use super::context::MigrationContext;
use super::file::parse_identifier;
use super::{BoxError, MigrationError};
use std::fmt;
use std::sync::Arc;

/// Forward or reverse change function of a migration
///
/// Receives the caller's context and the database handle. Migrations run
/// synchronously on the calling thread, one at a time.
pub type MigrationFn<Db> = Arc<dyn Fn(&MigrationContext, &Db) -> Result<(), BoxError> + Send + Sync>;

/// A versioned pair of change functions
///
/// `down` is optional; a migration without it is irreversible and
/// [`Migrator::down`](crate::migration::Migrator::down) stops with
/// `MigrationError::NoDownMigration` when it reaches it.
///
/// # Example
///
/// ```rust
/// use waterline::migration::{MemoryDatabase, Migration};
///
/// let migration = Migration::new(1, "create_users", |_ctx, db: &MemoryDatabase| {
///     db.execute("CREATE TABLE users (id BIGINT PRIMARY KEY)");
///     Ok(())
/// })
/// .with_down(|_ctx, db: &MemoryDatabase| {
///     db.execute("DROP TABLE users");
///     Ok(())
/// });
///
/// assert_eq!(migration.version(), 1);
/// assert!(migration.is_reversible());
/// ```
pub struct Migration<Db> {
    version: u64,
    description: String,
    up: MigrationFn<Db>,
    down: Option<MigrationFn<Db>>,
}

impl<Db> Migration<Db> {
    /// Create an irreversible migration with explicit metadata
    pub fn new<F>(version: u64, description: impl Into<String>, up: F) -> Self
    where
        F: Fn(&MigrationContext, &Db) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self {
            version,
            description: description.into(),
            up: Arc::new(up),
            down: None,
        }
    }

    /// Create a migration whose version and description come from an identifier
    /// such as `"3_add_index"` or `file!()` of a `3_add_index.rs` module
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Parse` if the identifier is malformed.
    pub fn from_source<F>(identifier: &str, up: F) -> Result<Self, MigrationError>
    where
        F: Fn(&MigrationContext, &Db) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let (version, description) = parse_identifier(identifier)?;
        Ok(Self::new(version, description, up))
    }

    /// Attach a down function
    #[must_use]
    pub fn with_down<F>(mut self, down: F) -> Self
    where
        F: Fn(&MigrationContext, &Db) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.down = Some(Arc::new(down));
        self
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_reversible(&self) -> bool {
        self.down.is_some()
    }

    pub fn up_fn(&self) -> &MigrationFn<Db> {
        &self.up
    }

    pub fn down_fn(&self) -> Option<&MigrationFn<Db>> {
        self.down.as_ref()
    }

    /// Run the function for `direction`
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::NoDownMigration` for `Down` on an irreversible
    /// migration and `MigrationError::MigrationFailed` if the function fails.
    pub fn run(
        &self,
        direction: MigrationDirection,
        ctx: &MigrationContext,
        db: &Db,
    ) -> Result<(), MigrationError> {
        let function = match direction {
            MigrationDirection::Up => &self.up,
            MigrationDirection::Down => self
                .down
                .as_ref()
                .ok_or(MigrationError::NoDownMigration { version: self.version })?,
        };

        function(ctx, db).map_err(|source| MigrationError::MigrationFailed {
            version: self.version,
            description: self.description.clone(),
            source,
        })
    }
}

// Manual impls: deriving would require `Db: Clone` / `Db: Debug`.
impl<Db> Clone for Migration<Db> {
    fn clone(&self) -> Self {
        Self {
            version: self.version,
            description: self.description.clone(),
            up: Arc::clone(&self.up),
            down: self.down.clone(),
        }
    }
}

impl<Db> fmt::Debug for Migration<Db> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migration")
            .field("version", &self.version)
            .field("description", &self.description)
            .field("reversible", &self.is_reversible())
            .finish()
    }
}

/// Direction for migration execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationDirection {
    /// Apply the migration (up)
    Up,
    /// Rollback the migration (down)
    Down,
}

impl MigrationDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationDirection::Up => "up",
            MigrationDirection::Down => "down",
        }
    }
}

impl fmt::Display for MigrationDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    #[allow(clippy::expect_used)] // Test code - expect is acceptable
    fn test_from_source_resolves_metadata() {
        let migration: Migration<()> =
            Migration::from_source("migrations/12_add_email.rs", |_, _| Ok(())).expect("should parse");
        assert_eq!(migration.version(), 12);
        assert_eq!(migration.description(), "add_email");
        assert!(!migration.is_reversible());
    }

    #[test]
    fn test_from_source_rejects_bad_identifier() {
        let result: Result<Migration<()>, _> = Migration::from_source("add_email.rs", |_, _| Ok(()));
        assert!(matches!(result, Err(MigrationError::Parse { .. })));
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn test_run_dispatches_by_direction() {
        let ups = Arc::new(AtomicUsize::new(0));
        let downs = Arc::new(AtomicUsize::new(0));
        let (ups_in, downs_in) = (Arc::clone(&ups), Arc::clone(&downs));

        let migration: Migration<()> = Migration::new(1, "counted", move |_, _| {
            ups_in.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .with_down(move |_, _| {
            downs_in.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let ctx = MigrationContext::new();
        migration.run(MigrationDirection::Up, &ctx, &()).expect("up should succeed");
        migration.run(MigrationDirection::Down, &ctx, &()).expect("down should succeed");
        migration.run(MigrationDirection::Up, &ctx, &()).expect("up should succeed");

        assert_eq!(ups.load(Ordering::SeqCst), 2);
        assert_eq!(downs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_run_down_without_down_fn() {
        let migration: Migration<()> = Migration::new(5, "one_way", |_, _| Ok(()));
        let result = migration.run(MigrationDirection::Down, &MigrationContext::new(), &());
        match result {
            Err(MigrationError::NoDownMigration { version }) => assert_eq!(version, 5),
            other => panic!("Expected NoDownMigration, got {other:?}"),
        }
    }

    #[test]
    fn test_run_wraps_failure_with_version() {
        let migration: Migration<()> = Migration::new(2, "broken", |_, _| Err("syntax error".into()));
        let result = migration.run(MigrationDirection::Up, &MigrationContext::new(), &());
        match result {
            Err(MigrationError::MigrationFailed { version, description, source }) => {
                assert_eq!(version, 2);
                assert_eq!(description, "broken");
                assert_eq!(source.to_string(), "syntax error");
            }
            other => panic!("Expected MigrationFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_clone_shares_functions() {
        let migration: Migration<()> = Migration::new(3, "shared", |_, _| Ok(()));
        let copy = migration.clone();
        assert!(Arc::ptr_eq(migration.up_fn(), copy.up_fn()));
        assert_eq!(format!("{copy:?}"), "Migration { version: 3, description: \"shared\", reversible: false }");
    }
}
