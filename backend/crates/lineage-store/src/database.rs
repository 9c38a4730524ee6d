//! Connection ownership and transaction boundaries.

use crate::error::{Result, StoreError};
use parking_lot::Mutex;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::time::Duration;

const MEMORY_LOCATION: &str = ":memory:";
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// A single SQLite connection shared between request handlers.
///
/// The connection is guarded by a mutex; callers get it for the duration of one
/// closure. The mutex is not re-entrant, so code running inside
/// [`Database::transaction`] must use the `Transaction` it was handed.
pub struct Database {
    conn: Mutex<Connection>,
    location: String,
}

impl Database {
    /// Open (or create) a database file. `:memory:` opens a private in-memory database.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str() == MEMORY_LOCATION {
            return Self::open_in_memory();
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        Self::configure(&conn)?;
        log::debug!("Opened database at {}", path.display());

        Ok(Self {
            conn: Mutex::new(conn),
            location: path.display().to_string(),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure(&conn)?;
        log::debug!("Opened in-memory database");

        Ok(Self {
            conn: Mutex::new(conn),
            location: MEMORY_LOCATION.to_string(),
        })
    }

    fn configure(conn: &Connection) -> Result<()> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(())
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Run `f` against the connection outside of any explicit transaction.
    pub fn with_connection<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&Connection) -> std::result::Result<T, E>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }

    /// Run `f` inside an immediate transaction.
    ///
    /// Commits when `f` returns `Ok`; rolls back and returns the error otherwise.
    pub fn transaction<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> std::result::Result<T, E>,
        E: From<StoreError>,
    {
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;

        match f(&tx) {
            Ok(value) => {
                tx.commit().map_err(StoreError::from)?;
                Ok(value)
            },
            Err(err) => {
                match tx.rollback() {
                    Ok(()) => log::debug!("Transaction rolled back"),
                    Err(rollback_err) => {
                        log::error!("Failed to roll back transaction: {}", rollback_err)
                    },
                }
                Err(err)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_table(db: &Database) {
        db.with_connection(|conn| conn.execute_batch("CREATE TABLE t (v INTEGER)"))
            .unwrap();
    }

    fn count(db: &Database) -> i64 {
        db.with_connection(|conn| conn.query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0)))
            .unwrap()
    }

    #[test]
    fn test_transaction_commits_on_ok() {
        let db = Database::open_in_memory().unwrap();
        create_table(&db);

        db.transaction(|tx| -> Result<()> {
            tx.execute("INSERT INTO t (v) VALUES (1)", [])?;
            Ok(())
        })
        .unwrap();

        assert_eq!(count(&db), 1);
    }

    #[test]
    fn test_transaction_rolls_back_on_err() {
        let db = Database::open_in_memory().unwrap();
        create_table(&db);

        let result = db.transaction(|tx| -> Result<()> {
            tx.execute("INSERT INTO t (v) VALUES (1)", [])?;
            Err(StoreError::Other("boom".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(count(&db), 0);
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("lineage.db");
        let db = Database::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(db.location(), path.display().to_string());
    }
}
