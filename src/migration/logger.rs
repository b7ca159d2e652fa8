//! Progress reporting for migration runs

use super::BoxError;

/// Sink for per-migration progress entries
///
/// The engine calls [`info`](MigrationLogger::info) once per applied or
/// reverted migration. A returned error is ignored: logging never changes the
/// outcome of a migration run.
pub trait MigrationLogger: Send + Sync {
    fn info(&self, message: &str, fields: &[(&str, String)]) -> Result<(), BoxError>;
}

/// Discards every entry; the default logger
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl MigrationLogger for NoopLogger {
    fn info(&self, _message: &str, _fields: &[(&str, String)]) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Forwards entries to the `log` facade at `info` level
#[derive(Debug, Clone)]
pub struct LogLogger {
    target: String,
}

impl LogLogger {
    #[must_use]
    pub fn new(target: impl Into<String>) -> Self {
        Self { target: target.into() }
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

impl Default for LogLogger {
    fn default() -> Self {
        Self::new("waterline")
    }
}

impl MigrationLogger for LogLogger {
    fn info(&self, message: &str, fields: &[(&str, String)]) -> Result<(), BoxError> {
        log::info!(target: &self.target, "{message}{}", format_fields(fields));
        Ok(())
    }
}

impl<F> MigrationLogger for F
where
    F: Fn(&str, &[(&str, String)]) -> Result<(), BoxError> + Send + Sync,
{
    fn info(&self, message: &str, fields: &[(&str, String)]) -> Result<(), BoxError> {
        self(message, fields)
    }
}

/// Render fields as ` key=value` pairs
pub(crate) fn format_fields(fields: &[(&str, String)]) -> String {
    fields
        .iter()
        .map(|(key, value)| format!(" {key}={value}"))
        .collect()
}
