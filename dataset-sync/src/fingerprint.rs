//! Content fingerprints of SQLite databases.
//!
//! A fingerprint covers logical content (schema and rows), not file bytes:
//! a VACUUM or a rebuild with identical rows keeps it stable, any row or
//! schema change moves it.
//!
//! Two implementations:
//! - [`DbHashTool`] runs SQLite's `dbhash` utility. Records written by
//!   earlier deployments hold `dbhash` output.
//! - [`LogicalContentHasher`] walks the database in-process using the same
//!   row encoding, digested with SHA-256.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Hex digest identifying a database's logical content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Error)]
pub enum FingerprintError {
    #[error("could not run {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    ToolFailed {
        program: PathBuf,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("{program} produced no hash")]
    EmptyOutput { program: PathBuf },

    #[error("SQLite error while hashing: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Computes a [`Fingerprint`] for a database file.
pub trait Fingerprinter {
    fn fingerprint(&self, path: &Path) -> Result<Fingerprint, FingerprintError>;
}

// ---------------------------------------------------------------------------
// dbhash
// ---------------------------------------------------------------------------

/// Runs `<program> <path>` and takes the first token of its output.
#[derive(Debug, Clone)]
pub struct DbHashTool {
    program: PathBuf,
}

impl DbHashTool {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for DbHashTool {
    fn default() -> Self {
        Self::new("dbhash")
    }
}

impl Fingerprinter for DbHashTool {
    fn fingerprint(&self, path: &Path) -> Result<Fingerprint, FingerprintError> {
        let output = Command::new(&self.program)
            .arg(path)
            .output()
            .map_err(|source| FingerprintError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(FingerprintError::ToolFailed {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        String::from_utf8_lossy(&output.stdout)
            .split_whitespace()
            .next()
            .map(|hash| Fingerprint(hash.to_string()))
            .ok_or_else(|| FingerprintError::EmptyOutput {
                program: self.program.clone(),
            })
    }
}

// ---------------------------------------------------------------------------
// In-process hasher
// ---------------------------------------------------------------------------

/// Hashes table rows (tables in case-insensitive name order), then the
/// schema. Virtual and `sqlite_*` tables are excluded from the row pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogicalContentHasher;

const TABLES_SQL: &str = "SELECT name FROM sqlite_master \
     WHERE type = 'table' AND sql NOT LIKE 'CREATE VIRTUAL%' AND name NOT LIKE 'sqlite_%' \
     ORDER BY name COLLATE nocase";

const SCHEMA_SQL: &str =
    "SELECT type, name, tbl_name, sql FROM sqlite_master ORDER BY name COLLATE nocase";

impl Fingerprinter for LogicalContentHasher {
    fn fingerprint(&self, path: &Path) -> Result<Fingerprint, FingerprintError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        let tables = conn
            .prepare(TABLES_SQL)?
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut hasher = Sha256::new();
        for table in &tables {
            let sql = format!("SELECT * FROM \"{}\"", table.replace('"', "\"\""));
            hash_query(&conn, &sql, &mut hasher)?;
        }
        hash_query(&conn, SCHEMA_SQL, &mut hasher)?;

        Ok(Fingerprint(hex::encode(hasher.finalize())))
    }
}

/// Feed every value of every row into `hasher`, each prefixed with a type
/// tag. Numbers are big-endian; text and blobs are raw bytes.
fn hash_query(conn: &Connection, sql: &str, hasher: &mut Sha256) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare(sql)?;
    let columns = stmt.column_count();
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        for i in 0..columns {
            match row.get_ref(i)? {
                ValueRef::Null => hasher.update(b"0"),
                ValueRef::Integer(v) => {
                    hasher.update(b"1");
                    hasher.update(v.to_be_bytes());
                }
                ValueRef::Real(v) => {
                    hasher.update(b"2");
                    hasher.update(v.to_bits().to_be_bytes());
                }
                ValueRef::Text(bytes) => {
                    hasher.update(b"3");
                    hasher.update(bytes);
                }
                ValueRef::Blob(bytes) => {
                    hasher.update(b"4");
                    hasher.update(bytes);
                }
            }
        }
    }
    Ok(())
}
