//! Cancellation and deadlines for migration runs

use crate::migration::MigrationError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Context handed to every migration function and checked between steps
///
/// Clones share the same cancellation flag, so a clone can be moved to another
/// thread and used to stop a running `up`/`down` batch. The engine only checks
/// the context before starting each migration; a migration that is already
/// running is never interrupted and may poll the context itself.
#[derive(Debug, Clone, Default)]
pub struct MigrationContext {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl MigrationContext {
    /// Context without deadline that is never cancelled unless asked to
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Context that expires `timeout` from now
    ///
    /// A timeout too large to represent as an `Instant` means no deadline.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => Self::with_deadline(deadline),
            None => Self::new(),
        }
    }

    /// Context that expires at `deadline`
    #[must_use]
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(deadline),
        }
    }

    /// Request cancellation; visible to every clone of this context
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether the deadline, if any, has passed
    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Time left before the deadline; `None` without a deadline
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Gate checked before the migration `next_version` starts
    pub(crate) fn check(&self, next_version: u64) -> Result<(), MigrationError> {
        if self.is_cancelled() {
            return Err(MigrationError::Cancelled { version: next_version });
        }
        if self.is_expired() {
            return Err(MigrationError::DeadlineExceeded { version: next_version });
        }
        Ok(())
    }
}
