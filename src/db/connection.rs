use crate::errors::StoreError;
use rusqlite::Connection;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::time::Duration;

const MAX_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(250);

// Thread-local connection slots, one per database path.
thread_local! {
    static DB_CONNS: RefCell<HashMap<String, Connection>> = RefCell::new(HashMap::new());
}

/// Cheap, cloneable handle (path only). Every thread opens its own connection on
/// first use, so fetch workers, the verification thread and dashboard workers never
/// share a `Connection`.
#[derive(Clone, Debug)]
pub struct Database {
    path: String,
}

impl Database {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Provides a mutable connection to the closure.
    pub fn with_conn<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Connection) -> Result<T, E>,
        E: From<StoreError>,
    {
        DB_CONNS
            .try_with(|cell| {
                let mut slots = cell.borrow_mut();
                if !slots.contains_key(&self.path) {
                    let conn = open_connection(&self.path)?;
                    slots.insert(self.path.clone(), conn);
                }
                match slots.get_mut(&self.path) {
                    Some(conn) => f(conn),
                    None => Err(StoreError::ConnectionSlot.into()),
                }
            })
            .map_err(|_| StoreError::ConnectionSlot)?
    }

    /// Like `with_conn`, but transient failures drop this thread's connection and
    /// retry with a growing delay. The closure must be safe to re-run.
    pub fn with_retry<F, T>(&self, op: &str, mut f: F) -> Result<T, StoreError>
    where
        F: FnMut(&mut Connection) -> Result<T, StoreError>,
    {
        let mut attempt = 1;
        loop {
            match self.with_conn(&mut f) {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < MAX_ATTEMPTS => {
                    tracing::warn!(op, attempt, error = %e, "transient store error, reconnecting");
                    self.reset_connection();
                    std::thread::sleep(RETRY_BASE_DELAY * 2u32.pow(attempt - 1));
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(op, attempt, error = %e, "store operation failed");
                    return Err(e);
                }
            }
        }
    }

    /// Forget this thread's connection; the next call reopens it.
    pub fn reset_connection(&self) {
        let _ = DB_CONNS.try_with(|cell| {
            cell.borrow_mut().remove(&self.path);
        });
    }
}

fn open_connection(path: &str) -> Result<Connection, StoreError> {
    let conn = Connection::open(path).map_err(|source| StoreError::Open {
        path: path.to_string(),
        source,
    })?;
    conn.busy_timeout(Duration::from_secs(5))?;
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
    Ok(conn)
}

/// Initialize database from a SQL schema file
pub fn init_db(db: &Database, schema_path: &str) -> Result<(), StoreError> {
    let schema_sql = fs::read_to_string(schema_path)
        .map_err(|e| StoreError::Schema(format!("Failed to read schema file: {e}")))?;

    db.with_conn(|conn| {
        conn.execute_batch(&schema_sql)
            .map_err(|e| StoreError::Schema(e.to_string()))
    })?;

    tracing::info!(schema_path, db = db.path(), "✅ Database initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connections_are_kept_per_path() {
        let dir = tempfile::tempdir().unwrap();
        let a = Database::new(dir.path().join("a.sqlite").to_string_lossy().to_string());
        let b = Database::new(dir.path().join("b.sqlite").to_string_lossy().to_string());

        a.with_conn(|conn| -> Result<(), StoreError> {
            conn.execute_batch("CREATE TABLE only_in_a (x INTEGER)")?;
            Ok(())
        })
        .unwrap();

        let in_b: i64 = b
            .with_conn(|conn| -> Result<i64, StoreError> {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE name = 'only_in_a'",
                    [],
                    |row| row.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(in_b, 0);
    }

    #[test]
    fn non_transient_errors_are_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("r.sqlite").to_string_lossy().to_string());
        let mut calls = 0;

        let result: Result<(), StoreError> = db.with_retry("bad sql", |conn| {
            calls += 1;
            conn.execute_batch("NOT VALID SQL")?;
            Ok(())
        });

        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
