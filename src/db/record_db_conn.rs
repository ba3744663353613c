// src/db/record_db_conn.rs
use std::{fs, path::Path};

use rusqlite::Connection;

use crate::error::Result;

/// Open (or create) the SQLite database holding encrypted records.
///
/// `:memory:` opens a private in-memory database.
pub fn open_record_db<P: AsRef<Path>>(db_path: P) -> Result<Connection> {
    let db_path = db_path.as_ref();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;

    tracing::debug!(path = %db_path.display(), "opened record database");
    Ok(conn)
}
