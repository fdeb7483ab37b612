use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use rusqlite::ToSql;

use crate::pool::{ConnectionPool, PooledConnection, Target, DEFAULT_ACQUIRE_TIMEOUT};
use crate::{migrations, Error, Result};

/// Handle to the embedded database. Cheap to clone; all writers serialize
/// through the pool.
#[derive(Clone)]
pub struct Store {
    pool: Arc<ConnectionPool>,
}

impl Store {
    /// Open (or create) the database at `path` and bring the schema up to
    /// the latest version. A failure here is fatal to startup.
    pub fn open(path: &Path, pool_size: usize) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Connection(format!("cannot create {}: {}", parent.display(), e)))?;
        }
        let pool = ConnectionPool::new(
            Target::File(path.to_path_buf()),
            pool_size,
            DEFAULT_ACQUIRE_TIMEOUT,
        );
        let store = Self { pool };
        store.init_schema()?;
        Ok(store)
    }

    /// Single shared in-memory database, for tests
    pub fn open_in_memory() -> Result<Self> {
        let pool = ConnectionPool::new(Target::Memory, 1, Duration::from_secs(5));
        let store = Self { pool };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let mut conn = self.conn()?;
        migrations::migrate_up(&mut conn)?;
        Ok(())
    }

    /// Acquire a pooled handle for read paths and typed query modules
    pub fn conn(&self) -> Result<PooledConnection> {
        self.pool.acquire()
    }

    pub fn schema_version(&self) -> Result<i64> {
        let conn = self.conn()?;
        migrations::current_version(&conn)
    }

    /// Lightweight readiness probe for health endpoints
    pub fn ping(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    pub fn execute_update(&self, sql: &str, params: &[&dyn ToSql]) -> Result<usize> {
        let conn = self.conn()?;
        Ok(conn.execute(sql, params)?)
    }

    pub fn execute_insert(&self, sql: &str, params: &[&dyn ToSql]) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(sql, params)?;
        Ok(conn.last_insert_rowid())
    }

    /// Run `f` inside a transaction: commit on success, roll back on every
    /// error path. Retried once, only when the failure was a lock-acquire
    /// timeout.
    pub fn transaction<T>(
        &self,
        mut f: impl FnMut(&rusqlite::Transaction<'_>) -> Result<T>,
    ) -> Result<T> {
        let mut conn = self.conn()?;
        let mut attempt = 0;
        loop {
            let tx = conn.transaction()?;
            match f(&tx) {
                Ok(value) => {
                    tx.commit()?;
                    return Ok(value);
                }
                Err(e) if e.is_lock_timeout() && attempt == 0 => {
                    drop(tx);
                    attempt += 1;
                    tracing::warn!("transaction hit a lock timeout, retrying once");
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_in_memory_initializes_schema() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.schema_version().unwrap(), 3);
        store.ping().unwrap();
    }

    #[test]
    fn transaction_rolls_back_on_error() {
        let store = Store::open_in_memory().unwrap();
        let result: Result<()> = store.transaction(|tx| {
            tx.execute("INSERT INTO tags (name) VALUES ('doomed')", [])?;
            Err(Error::Schema("forced failure".to_string()))
        });
        assert!(result.is_err());

        let conn = store.conn().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM tags", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn transaction_commits_on_success() {
        let store = Store::open_in_memory().unwrap();
        store
            .transaction(|tx| {
                tx.execute("INSERT INTO tags (name) VALUES ('kept')", [])?;
                Ok(())
            })
            .unwrap();

        let conn = store.conn().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM tags", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn open_creates_file_and_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("lifelog.db");
        {
            let store = Store::open(&path, 2).unwrap();
            store
                .execute_update("INSERT INTO tags (name) VALUES (?1)", &[&"persisted"])
                .unwrap();
        }
        let store = Store::open(&path, 2).unwrap();
        let conn = store.conn().unwrap();
        let name: String = conn
            .query_row("SELECT name FROM tags LIMIT 1", [], |row| row.get(0))
            .unwrap();
        assert_eq!(name, "persisted");
    }
}
