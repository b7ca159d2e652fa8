//! # Waterline
//!
//! Versioned schema migrations with a persisted history table.
//!
//! Register migrations with a [`Migrator`](migration::Migrator), point it at a
//! database handle that implements [`HistoryStore`](migration::HistoryStore)
//! and call `up`, `down` or `version`. The `postgres` feature implements the
//! history store for `may_postgres::Client`.

pub mod config;
#[cfg(feature = "postgres")]
pub mod connection;
#[cfg(any(feature = "metrics", feature = "tracing"))]
pub mod metrics;
pub mod migration;

pub use config::MigrateConfig;
pub use migration::{GlobalMigrator, Migration, MigrationContext, MigrationError, Migrator};

#[doc(hidden)]
pub mod __private {
    pub use once_cell::sync::Lazy;
}
