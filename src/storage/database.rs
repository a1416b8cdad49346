use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use super::{StoreResult, ensure_parent_dir};

/// Shared SQLite connection.
///
/// `Connection` is `Send` but not `Sync`, so access is serialized through a
/// mutex and callers borrow it for one closure at a time.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        ensure_parent_dir(&path)?;
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> StoreResult<T>) -> StoreResult<T> {
        let mut conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut conn)
    }
}
