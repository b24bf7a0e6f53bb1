//! Structural consistency check run on a staged database before it is
//! trusted.

use std::path::Path;

use rusqlite::{Connection, OpenFlags};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntegrityError {
    /// `PRAGMA quick_check` reported problems.
    #[error("integrity check failed: {message}")]
    Failed { message: String },

    /// The check itself could not run (unreadable or non-database file).
    #[error("SQLite error during integrity check: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Open `path` read-only and run `PRAGMA quick_check`.
///
/// Anything other than a single `ok` row is [`IntegrityError::Failed`].
pub fn check_integrity(path: &Path) -> Result<(), IntegrityError> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    let mut stmt = conn.prepare("PRAGMA quick_check")?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    match rows.as_slice() {
        [only] if only == "ok" => {
            tracing::info!(path = %path.display(), result = "ok", "SQLite integrity check");
            Ok(())
        }
        [] => Err(IntegrityError::Failed {
            message: "quick_check returned no result".to_string(),
        }),
        _ => Err(IntegrityError::Failed {
            message: rows.join("; "),
        }),
    }
}
