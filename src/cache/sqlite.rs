//! Single-file record store on SQLite.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};

use crate::cache::store::RecordStore;
use crate::error::{NifError, Result};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS puzzles (
    key  TEXT PRIMARY KEY NOT NULL,
    data BLOB NOT NULL
) WITHOUT ROWID;
";

/// A record store backed by one SQLite database file.
///
/// The connection is opened once per run and shared by all load workers
/// behind a mutex.
#[derive(Debug)]
pub struct SqliteRecordStore {
    path: PathBuf,
    conn: Mutex<Connection>,
}

impl SqliteRecordStore {
    /// Open (or create) the store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path).map_err(|e| {
            NifError::store(format!("failed to open {}: {e}", path.display()))
        })?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.execute_batch(SCHEMA)?;

        Ok(SqliteRecordStore {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(SqliteRecordStore {
            path: PathBuf::from(":memory:"),
            conn: Mutex::new(conn),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordStore for SqliteRecordStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let conn = self.conn.lock();
        let payload = conn
            .query_row(
                "SELECT data FROM puzzles WHERE key = ?1",
                params![key],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;
        Ok(payload)
    }

    fn put(&self, key: &str, payload: &[u8]) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO puzzles (key, data) VALUES (?1, ?2)",
            params![key, payload],
        )?;
        Ok(())
    }

    fn keys(&self) -> Result<HashSet<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT key FROM puzzles")?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<HashSet<String>>>()?;
        Ok(keys)
    }

    fn delete_many(&self, keys: &[String]) -> Result<usize> {
        if keys.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let mut deleted = 0;
        {
            let mut stmt = tx.prepare("DELETE FROM puzzles WHERE key = ?1")?;
            for key in keys {
                deleted += stmt.execute(params![key])?;
            }
        }
        tx.commit()?;
        Ok(deleted)
    }

    fn len(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM puzzles", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn checkpoint(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.query_row("PRAGMA wal_checkpoint(PASSIVE)", [], |_| Ok(()))?;
        Ok(())
    }
}
