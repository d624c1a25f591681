//! SQLite store handle shared by every adapter

use super::traits::{OpenStore, StorageError, StorageResult};
use crate::row::SqlValue;
use rusqlite::{Connection, OpenFlags};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// Idle connections kept around after use. Extra connections opened under
/// load are closed when they are handed back.
const MAX_IDLE_CONNECTIONS: usize = 4;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Read-only SQLite store.
///
/// Holds a small pool of read-only connections to one database file. A
/// caller borrows a connection for the duration of one query, so a long
/// scan never blocks point lookups or catalog reads issued meanwhile.
/// Shared between adapters through `Arc<SqliteStore>`.
pub struct SqliteStore {
    path: PathBuf,
    idle: Mutex<Vec<Connection>>,
}

impl SqliteStore {
    fn connect(path: &Path) -> StorageResult<Connection> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_NO_MUTEX
                | OpenFlags::SQLITE_OPEN_URI,
        )?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }

    /// Path of the underlying database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of connections currently parked in the pool
    pub fn idle_connections(&self) -> usize {
        self.idle.lock().unwrap().len()
    }

    /// Run `f` with a pooled connection.
    ///
    /// The connection is returned to the pool afterwards whether or not `f`
    /// succeeded.
    pub fn with_connection<T, E>(&self, f: impl FnOnce(&Connection) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StorageError>,
    {
        let pooled = self.idle.lock().unwrap().pop();
        let conn = match pooled {
            Some(conn) => conn,
            None => Self::connect(&self.path)?,
        };

        let result = f(&conn);

        let mut idle = self.idle.lock().unwrap();
        if idle.len() < MAX_IDLE_CONNECTIONS {
            idle.push(conn);
        }
        result
    }
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(StorageError::FileNotFound(path));
        }

        // Open one connection eagerly so a broken file fails at startup
        let conn = Self::connect(&path)?;

        Ok(Self {
            path,
            idle: Mutex::new(vec![conn]),
        })
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Quote an identifier for interpolation into SQL text.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Predicate comparing `column` with text parameter `?param` in the coerced
/// form a row identity takes: integers as decimal text, blobs as their
/// bytes read as text. Plain `=` misses both in columns without a numeric
/// or text affinity.
pub fn coerced_match(column: &str, param: usize) -> String {
    let column = quote_ident(column);
    format!(
        "(typeof({col}) IN ('integer', 'blob') AND CAST({col} AS TEXT) = ?{param})",
        col = column,
        param = param
    )
}

/// Read every column of a result row into a name → value map.
pub fn read_fields(
    row: &rusqlite::Row<'_>,
    names: &[String],
) -> rusqlite::Result<BTreeMap<String, SqlValue>> {
    let mut fields = BTreeMap::new();
    for (idx, name) in names.iter().enumerate() {
        fields.insert(name.clone(), SqlValue::from(row.get_ref(idx)?));
    }
    Ok(fields)
}
