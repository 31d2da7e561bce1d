//! SQLite Datastore
//!
//! A single serialized connection shared across the service. Blocking SQLite
//! calls run on the blocking pool; every call is bounded by the configured
//! operation timeout and surfaces as a retryable [`StoreError::Timeout`].
//!
//! An operation that reaches the connection after its caller timed out is
//! skipped. One that already started runs to completion even though its
//! caller saw a timeout, so only idempotency-keyed placements are safe to
//! retry after a timeout.

use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::config::{StoreConfig, StoreLocation};
use crate::error::{StoreError, StoreResult};
use crate::schema::CANVAS_SCHEMA;

/// SQLite datastore
pub struct SqliteDatastore {
    conn: Arc<Mutex<Connection>>,
    op_timeout: Duration,
}

impl SqliteDatastore {
    /// Open a datastore
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        let conn = match &config.location {
            StoreLocation::Memory => Connection::open_in_memory(),
            StoreLocation::File(path) => Connection::open(path),
        }
        .map_err(|e| StoreError::Connection(e.to_string()))?;

        conn.busy_timeout(config.busy_timeout)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        if matches!(config.location, StoreLocation::File(_)) {
            conn.pragma_update(None, "journal_mode", "WAL")?;
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            op_timeout: config.op_timeout,
        })
    }

    /// Create tables and indexes
    pub async fn init_schema(&self) -> StoreResult<()> {
        self.run(|conn| {
            conn.execute_batch(CANVAS_SCHEMA)?;
            Ok(())
        })
        .await
    }

    /// Check the connection answers
    pub async fn ping(&self) -> StoreResult<()> {
        self.run(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
        .await
    }

    /// Operation timeout
    pub fn op_timeout(&self) -> Duration {
        self.op_timeout
    }

    /// Run a closure against the connection on the blocking pool
    pub async fn run<T, F>(&self, op: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let millis = self.op_timeout.as_millis() as u64;
        let deadline = Instant::now() + self.op_timeout;
        let task = tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| StoreError::internal("connection mutex poisoned"))?;
            if Instant::now() >= deadline {
                return Err(StoreError::Timeout { millis });
            }
            op(&mut guard)
        });

        match tokio::time::timeout(self.op_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(StoreError::internal(format!(
                "blocking task failed: {}",
                join_err
            ))),
            Err(_) => Err(StoreError::Timeout { millis }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn test_open_and_ping() {
        let store = SqliteDatastore::open(&StoreConfig::memory()).unwrap();
        store.init_schema().await.unwrap();
        store.ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_timeout_is_retryable() {
        let config = StoreConfig::memory().with_op_timeout(Duration::from_millis(20));
        let store = SqliteDatastore::open(&config).unwrap();

        let err = store
            .run(|_conn| {
                std::thread::sleep(Duration::from_millis(200));
                Ok(())
            })
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Timeout { millis: 20 }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_operation_queued_past_its_deadline_is_skipped() {
        let config = StoreConfig::memory().with_op_timeout(Duration::from_millis(20));
        let store = SqliteDatastore::open(&config).unwrap();

        let slow = store
            .run(|_conn| {
                std::thread::sleep(Duration::from_millis(200));
                Ok(())
            })
            .await;
        assert!(matches!(slow, Err(StoreError::Timeout { .. })));

        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        let queued = store
            .run(move |_conn| {
                flag.store(true, Ordering::SeqCst);
                Ok(())
            })
            .await;
        assert!(matches!(queued, Err(StoreError::Timeout { .. })));

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!ran.load(Ordering::SeqCst));
        store.ping().await.unwrap();
    }
}
