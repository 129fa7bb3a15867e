//! Primary key allocator.
//!
//! One counter row per table kind in the `pk` table. Every insert made
//! through [`record::create`](super::record::create) passes through
//! [`PkSequence::assign`]: rows without an id get the next value, rows with an
//! explicit id advance the counter when they exceed it. Ids are never reused.

use crate::error::{HubError, Result};
use crate::schema::{self, Table};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, error};

/// Process-wide allocator.
pub static SEQUENCE: PkSequence = PkSequence::new();

/// Persistent per-kind id sequence.
///
/// The mutex is held for each read-modify-write of a counter. Counter I/O
/// runs on the caller's connection, inside the caller's transaction when
/// there is one: SQLite admits a single writer, so a second connection would
/// block behind an open write transaction.
#[derive(Debug)]
pub struct PkSequence {
    mutex: Mutex<()>,
}

impl Default for PkSequence {
    fn default() -> Self {
        Self::new()
    }
}

impl PkSequence {
    pub const fn new() -> Self {
        Self {
            mutex: Mutex::new(()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>> {
        self.mutex.lock().map_err(|_| HubError::Fatal {
            message: "PK allocator lock poisoned".to_string(),
        })
    }

    /// Seed every counter with `max(stored, MAX(id))` of its table.
    pub fn load(&self, conn: &Connection) -> Result<()> {
        let _guard = self.lock()?;
        for table in schema::keyed_tables() {
            let kind = table.kind();
            let observed: Option<i64> =
                conn.query_row(&format!("SELECT MAX(id) FROM {}", table.name), [], |row| {
                    row.get(0)
                })?;
            let observed = observed.unwrap_or(0).max(0) as u64;
            let stored = read(conn, &kind)?.unwrap_or(0);
            write(conn, &kind, stored.max(observed))?;
            debug!("PK loaded: {} last_id={}", kind, stored.max(observed));
        }
        Ok(())
    }

    /// Allocate the next id for `kind`.
    pub fn next(&self, conn: &Connection, kind: &str) -> Result<u64> {
        let _guard = self.lock()?;
        let id = read(conn, kind)?.unwrap_or(0) + 1;
        write(conn, kind, id)?;
        Ok(id)
    }

    /// Record an explicitly assigned id; advances the counter when `id` is
    /// past it.
    pub fn assigned(&self, conn: &Connection, kind: &str, id: u64) -> Result<()> {
        let _guard = self.lock()?;
        let last = read(conn, kind)?.unwrap_or(0);
        if id > last {
            write(conn, kind, id)?;
        }
        Ok(())
    }

    /// Insert hook: allocate when `id` is zero, else reserve it.
    pub fn assign(&self, conn: &Connection, table: &Table, id: u64) -> Result<u64> {
        let kind = table.kind();
        if id == 0 {
            self.next(conn, &kind)
        } else {
            self.assigned(conn, &kind, id)?;
            Ok(id)
        }
    }

    /// Last allocated id for `kind`.
    pub fn last(&self, conn: &Connection, kind: &str) -> Result<u64> {
        let _guard = self.lock()?;
        Ok(read(conn, kind)?.unwrap_or(0))
    }
}

fn read(conn: &Connection, kind: &str) -> Result<Option<u64>> {
    let last: Option<i64> = conn
        .query_row(
            "SELECT last_id FROM pk WHERE kind = ?1",
            params![kind],
            |row| row.get(0),
        )
        .optional()?;
    Ok(last.map(|n| n.max(0) as u64))
}

fn write(conn: &Connection, kind: &str, last_id: u64) -> Result<()> {
    conn.execute(
        "INSERT INTO pk (kind, last_id) VALUES (?1, ?2)
         ON CONFLICT(kind) DO UPDATE SET last_id = excluded.last_id",
        params![kind, last_id as i64],
    )
    .map_err(|e| {
        error!("PK counter write failed: kind={} err={}", kind, e);
        HubError::Fatal {
            message: format!("PK counter for {} could not be written: {}", kind, e),
        }
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;

    #[test]
    fn test_next_monotonic() {
        let db = Database::open_in_memory().unwrap();
        let seq = PkSequence::new();
        db.read(|conn| {
            assert_eq!(seq.next(conn, "TAG")?, 1);
            assert_eq!(seq.next(conn, "TAG")?, 2);
            assert_eq!(seq.next(conn, "APPLICATION")?, 1);
            seq.assigned(conn, "TAG", 10)?;
            assert_eq!(seq.next(conn, "TAG")?, 11);
            seq.assigned(conn, "TAG", 5)?;
            assert_eq!(seq.next(conn, "TAG")?, 12);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_load_takes_max() {
        let db = Database::open_in_memory().unwrap();
        db.read(|conn| {
            conn.execute("INSERT INTO setting (id, key) VALUES (40, 'x')", [])?;
            let seq = PkSequence::new();
            seq.load(conn)?;
            assert_eq!(seq.last(conn, "SETTING")?, 40);
            // Stored counter higher than observed rows is kept.
            seq.assigned(conn, "SETTING", 90)?;
            seq.load(conn)?;
            assert_eq!(seq.last(conn, "SETTING")?, 90);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_counter_rolls_back_with_transaction() {
        let db = Database::open_in_memory().unwrap();
        let seq = PkSequence::new();
        let _ = db.write(|tx| {
            seq.next(tx, "TAG")?;
            Err::<(), _>(HubError::bad_request("abort"))
        });
        db.read(|conn| {
            assert_eq!(seq.next(conn, "TAG")?, 1);
            Ok(())
        })
        .unwrap();
    }
}
