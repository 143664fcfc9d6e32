//! Structural validation of SQLite database files.
//!
//! A database file goes into an archive only if SQLite's own consistency
//! check accepts it.

use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use tracing::warn;

/// Run SQLite's built-in structural check against a database file.
///
/// Never fails: any open or query error is reported as an invalid file,
/// with a warning logged. No side effects.
pub fn validate(path: &Path) -> bool {
    match integrity_check(path) {
        Ok(true) => true,
        Ok(false) => {
            warn!(file = %path.display(), "integrity check reported inconsistencies");
            false
        }
        Err(e) => {
            warn!(file = %path.display(), error = %e, "failed to validate database file");
            false
        }
    }
}

fn integrity_check(path: &Path) -> rusqlite::Result<bool> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    // Reports "ok" as the single result row on a sound database; anything
    // else is a list of problems.
    let result: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
    Ok(result == "ok")
}
