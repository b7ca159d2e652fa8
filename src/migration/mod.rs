//! Versioned schema migrations
//!
//! This module provides:
//! - [`Migration`]: a versioned pair of up/down functions
//! - [`MigrationRegistry`]: the ordered set of known migrations
//! - [`HistoryStore`]: the persisted ledger of applied versions
//! - [`Migrator`]: computes pending work and runs it
//! - [`GlobalMigrator`]: a lock-protected migrator for `static` use
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use waterline::migration::{MemoryDatabase, Migration, MigrationContext, Migrator};
//!
//! # fn main() -> Result<(), waterline::migration::MigrationError> {
//! let db = Arc::new(MemoryDatabase::new());
//! let migrator = Migrator::with_migrations(
//!     Arc::clone(&db),
//!     [
//!         Migration::new(1, "create_users", |_, db: &MemoryDatabase| {
//!             db.execute("CREATE TABLE users (id BIGINT PRIMARY KEY)");
//!             Ok(())
//!         })
//!         .with_down(|_, db: &MemoryDatabase| {
//!             db.execute("DROP TABLE users");
//!             Ok(())
//!         }),
//!         Migration::from_source("2_add_email.rs", |_, db: &MemoryDatabase| {
//!             db.execute("ALTER TABLE users ADD COLUMN email TEXT");
//!             Ok(())
//!         })?,
//!     ],
//! )?;
//!
//! let ctx = MigrationContext::new();
//! migrator.up(&ctx, 0)?;
//! assert_eq!(migrator.version(&ctx)?, (2, "add_email".to_string()));
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod error;
pub mod file;
pub mod global;
pub mod history;
pub mod logger;
pub mod memory;
#[allow(clippy::module_inception)]
pub mod migration;
pub mod migrator;
pub mod record;
pub mod registry;
#[cfg(feature = "postgres")]
pub mod state_table;
pub mod status;

pub use context::MigrationContext;
pub use error::MigrationError;
pub use file::parse_identifier;
pub use global::GlobalMigrator;
pub use history::{HistoryError, HistoryStore};
pub use logger::{LogLogger, MigrationLogger, NoopLogger};
pub use memory::MemoryDatabase;
pub use migration::{Migration, MigrationDirection, MigrationFn};
pub use migrator::Migrator;
pub use record::MigrationRecord;
pub use registry::MigrationRegistry;
pub use status::{MigrationStatus, PendingMigration};

/// Error type returned by user migration functions
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
