pub mod migrations;
pub mod repository;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;

pub use repository::{KeyValueStore, MemoryStore, SqliteStore};

/// Open the database at `path` in WAL mode with migrations applied.
pub fn open(path: &Path) -> Result<Connection> {
    let conn =
        Connection::open(path).with_context(|| format!("Opening database at {:?}", path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    migrations::run_migrations(&conn)?;
    Ok(conn)
}
