use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use rusqlite::Connection;

use crate::{Error, Result};

pub const DEFAULT_POOL_SIZE: usize = 10;
pub const MAX_POOL_SIZE: usize = 100;
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the pool opens its connections
#[derive(Debug, Clone)]
pub enum Target {
    File(PathBuf),
    /// Single shared in-memory database, for tests. Forces pool size 1 so
    /// every caller sees the same database.
    Memory,
}

/// Bounded pool of reusable SQLite handles. Handles are validated with a
/// SELECT 1 round-trip before reuse and discarded when validation fails.
#[derive(Debug)]
pub struct ConnectionPool {
    target: Target,
    size: usize,
    acquire_timeout: Duration,
    inner: Mutex<PoolInner>,
    available: Condvar,
}

#[derive(Debug)]
struct PoolInner {
    idle: Vec<Connection>,
    total: usize,
}

impl ConnectionPool {
    pub fn new(target: Target, size: usize, acquire_timeout: Duration) -> Arc<Self> {
        let size = match target {
            Target::Memory => 1,
            Target::File(_) => size.clamp(1, MAX_POOL_SIZE),
        };
        Arc::new(Self {
            target,
            size,
            acquire_timeout,
            inner: Mutex::new(PoolInner {
                idle: Vec::new(),
                total: 0,
            }),
            available: Condvar::new(),
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Acquire a handle, creating one if the pool is under capacity.
    /// Blocks up to the acquire timeout when the pool is exhausted.
    pub fn acquire(self: &Arc<Self>) -> Result<PooledConnection> {
        let deadline = Instant::now() + self.acquire_timeout;
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| Error::Connection("connection pool poisoned".to_string()))?;

        loop {
            while let Some(conn) = inner.idle.pop() {
                if validate(&conn) {
                    return Ok(PooledConnection {
                        conn: Some(conn),
                        pool: Arc::clone(self),
                    });
                }
                // Broken handle: drop it and let a fresh one replace it
                inner.total -= 1;
            }

            if inner.total < self.size {
                inner.total += 1;
                drop(inner);
                match self.open_connection() {
                    Ok(conn) => {
                        return Ok(PooledConnection {
                            conn: Some(conn),
                            pool: Arc::clone(self),
                        });
                    }
                    Err(e) => {
                        let mut inner = self
                            .inner
                            .lock()
                            .map_err(|_| Error::Connection("connection pool poisoned".to_string()))?;
                        inner.total -= 1;
                        self.available.notify_one();
                        return Err(e);
                    }
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(Error::Connection(format!(
                    "timed out acquiring a connection after {:?}",
                    self.acquire_timeout
                )));
            }
            let (guard, timeout) = self
                .available
                .wait_timeout(inner, remaining)
                .map_err(|_| Error::Connection("connection pool poisoned".to_string()))?;
            inner = guard;
            if timeout.timed_out() && inner.idle.is_empty() && inner.total >= self.size {
                return Err(Error::Connection(format!(
                    "timed out acquiring a connection after {:?}",
                    self.acquire_timeout
                )));
            }
        }
    }

    fn open_connection(&self) -> Result<Connection> {
        let conn = match &self.target {
            Target::File(path) => Connection::open(path)
                .map_err(|e| Error::Connection(format!("failed to open {}: {}", path.display(), e)))?,
            Target::Memory => Connection::open_in_memory()
                .map_err(|e| Error::Connection(format!("failed to open in-memory database: {}", e)))?,
        };
        configure(&conn)?;
        Ok(conn)
    }

    fn release(&self, conn: Connection) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        // A handle that fails validation on return is discarded, not pooled
        if validate(&conn) {
            inner.idle.push(conn);
        } else {
            inner.total -= 1;
        }
        self.available.notify_one();
    }
}

/// Per-connection pragmas: WAL journaling, normal synchronous, generous
/// cache, in-memory temp storage, enforced foreign keys.
fn configure(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "cache_size", 10_000)?;
    conn.pragma_update(None, "temp_store", "MEMORY")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(Duration::from_secs(5))?;
    Ok(())
}

fn validate(conn: &Connection) -> bool {
    conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
        .is_ok()
}

/// A pooled handle. Returned to the pool on drop.
#[derive(Debug)]
pub struct PooledConnection {
    conn: Option<Connection>,
    pool: Arc<ConnectionPool>,
}

impl std::ops::Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn.as_ref().expect("connection taken")
    }
}

impl std::ops::DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Connection {
        self.conn.as_mut().expect("connection taken")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_reuses_idle_handles() {
        let pool = ConnectionPool::new(Target::Memory, 4, Duration::from_secs(1));
        {
            let conn = pool.acquire().unwrap();
            conn.execute_batch("CREATE TABLE t (x INTEGER)").unwrap();
        }
        // Memory target pins the pool to a single shared handle
        let conn = pool.acquire().unwrap();
        conn.execute("INSERT INTO t (x) VALUES (1)", []).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn exhausted_pool_times_out() {
        let pool = ConnectionPool::new(Target::Memory, 1, Duration::from_millis(50));
        let held = pool.acquire().unwrap();
        let err = pool.acquire().unwrap_err();
        assert!(matches!(err, Error::Connection(_)));
        drop(held);
        assert!(pool.acquire().is_ok());
    }

    #[test]
    fn file_pool_respects_cap() {
        let dir = tempfile::tempdir().unwrap();
        let pool = ConnectionPool::new(
            Target::File(dir.path().join("pool.db")),
            500,
            Duration::from_secs(1),
        );
        assert_eq!(pool.size(), MAX_POOL_SIZE);
    }
}
