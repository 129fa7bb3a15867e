//! SQLite persistence.
//!
//! A single [`Database`] handle wraps one connection behind
//! `Arc<Mutex<Connection>>`. Reads run against the locked connection; writes
//! run inside a transaction that commits only when the closure succeeds.

pub mod pk;
pub mod query;
pub mod record;

pub use pk::{PkSequence, SEQUENCE};
pub use query::{Query, SqlValue};
pub use record::Record;

use crate::config::DatabaseConfig;
use crate::error::{HubError, Result};
use crate::schema;
use rusqlite::{Connection, Transaction};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// Shared database handle.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("path", &self.path).finish()
    }
}

impl Database {
    /// Open (or create) the database at `db_path`.
    ///
    /// Creates parent directories, applies pragmas, creates missing tables,
    /// and loads the PK counters.
    pub fn open_at(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| HubError::Io {
                    message: format!("Failed to create database directory: {}", parent.display()),
                    path: Some(parent.to_path_buf()),
                    source: Some(e),
                })?;
            }
        }

        let conn = Connection::open(db_path)?;
        Self::configure_connection(&conn, true)?;
        Self::ensure_schema(&conn)?;
        SEQUENCE.load(&conn)?;
        info!("Database opened: {}", db_path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(db_path.to_path_buf()),
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure_connection(&conn, false)?;
        Self::ensure_schema(&conn)?;
        SEQUENCE.load(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    /// Database file, when file-backed.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn configure_connection(conn: &Connection, wal: bool) -> Result<()> {
        if wal {
            conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        }
        conn.execute_batch(&format!(
            "PRAGMA busy_timeout={};\n\
             PRAGMA synchronous=NORMAL;\n\
             PRAGMA temp_store=MEMORY;\n\
             PRAGMA foreign_keys=ON;",
            DatabaseConfig::BUSY_TIMEOUT.as_millis(),
        ))?;
        Ok(())
    }

    fn ensure_schema(conn: &Connection) -> Result<()> {
        for table in schema::TABLES {
            conn.execute_batch(&table.ddl())?;
        }
        debug!("Schema ensured: {} tables", schema::TABLES.len());
        Ok(())
    }

    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| HubError::Database {
            message: "Failed to acquire database connection lock".to_string(),
            source: None,
        })
    }

    /// Run `f` against the connection.
    pub fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.lock_conn()?;
        f(&conn)
    }

    /// Run `f` in a transaction; commit when it returns `Ok`.
    pub fn write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

/// Run `f` inside a named savepoint on `conn`.
///
/// Nests under an open transaction; rolls back to the savepoint when `f`
/// fails.
pub fn savepoint<T, F>(conn: &Connection, name: &str, f: F) -> Result<T>
where
    F: FnOnce(&Connection) -> Result<T>,
{
    conn.execute_batch(&format!("SAVEPOINT {}", name))?;
    match f(conn) {
        Ok(value) => {
            conn.execute_batch(&format!("RELEASE {}", name))?;
            Ok(value)
        }
        Err(err) => {
            conn.execute_batch(&format!("ROLLBACK TO {}; RELEASE {}", name, name))?;
            Err(err)
        }
    }
}

/// Current time as stored in timestamp columns.
pub fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use tempfile::TempDir;

    /// File-backed database in a temporary directory.
    pub fn create_test_db() -> (Database, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open_at(&temp_dir.path().join("hub.db")).unwrap();
        (db, temp_dir)
    }
}
