//! Migration identifier parsing
//!
//! Migrations are identified by a file-like name, `<version>_<description>[.ext]`,
//! typically the `file!()` of the module that registers them.

use crate::migration::MigrationError;
use once_cell::sync::Lazy;
use regex::Regex;

#[allow(clippy::expect_used)] // Constant pattern, covered by tests
static IDENTIFIER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)_(.+)$").expect("identifier pattern is valid"));

/// Parse a migration identifier into its version and description
///
/// Only the last path component is looked at and a single trailing extension
/// is stripped, so both `"1_create_users"` and `"src/migrations/1_create_users.rs"`
/// yield `(1, "create_users")`.
///
/// # Errors
///
/// Returns `MigrationError::Parse` if the identifier is empty, does not start
/// with an unsigned integer, lacks the `_` separator or a description, or if
/// the version does not fit in a `u64`.
pub fn parse_identifier(identifier: &str) -> Result<(u64, String), MigrationError> {
    let invalid = |reason: &str| MigrationError::Parse {
        identifier: identifier.to_string(),
        reason: reason.to_string(),
    };

    let base = base_name(identifier);
    if base.is_empty() {
        return Err(invalid("identifier is empty"));
    }

    let stem = strip_extension(base);

    let caps = IDENTIFIER_PATTERN
        .captures(stem)
        .ok_or_else(|| invalid("expected '<version>_<description>'"))?;

    let (Some(version_str), Some(description)) = (caps.get(1), caps.get(2)) else {
        return Err(invalid("expected '<version>_<description>'"));
    };

    let version = version_str
        .as_str()
        .parse::<u64>()
        .map_err(|e| invalid(&format!("version '{}' is not a valid u64: {e}", version_str.as_str())))?;

    Ok((version, description.as_str().to_string()))
}

fn base_name(identifier: &str) -> &str {
    identifier
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(identifier)
}

fn strip_extension(base: &str) -> &str {
    match base.rfind('.') {
        // A leading dot is a hidden file name, not an extension
        Some(idx) if idx > 0 => &base[..idx],
        _ => base,
    }
}
