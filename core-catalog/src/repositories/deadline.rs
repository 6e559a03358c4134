//! Statement deadlines for pooled SQLite connections
//!
//! A [`DeadlineConnection`] installs a progress handler that tells SQLite to
//! interrupt the running statement once the deadline has passed. The
//! statement stops inside the engine and its connection is free for the next
//! caller as soon as the interrupt surfaces.

use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection};
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

/// VM instructions executed between deadline checks
const PROGRESS_INTERVAL: i32 = 1_000;

/// Primary result code SQLite reports for an interrupted statement
const SQLITE_INTERRUPT: &str = "9";

/// Pooled connection armed with a statement deadline.
///
/// The handler is disarmed when the guard is released or dropped, so a
/// connection handed back to the pool never interrupts a later caller.
pub(crate) struct DeadlineConnection {
    conn: PoolConnection<Sqlite>,
    armed: Arc<AtomicBool>,
}

impl DeadlineConnection {
    /// Arm `conn` so statements still running at `deadline` are interrupted
    pub(crate) async fn arm(
        mut conn: PoolConnection<Sqlite>,
        deadline: Instant,
    ) -> Result<Self, sqlx::Error> {
        let armed = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&armed);

        // Returning false makes SQLite abort the statement with SQLITE_INTERRUPT
        conn.lock_handle()
            .await?
            .set_progress_handler(PROGRESS_INTERVAL, move || {
                !(flag.load(Ordering::Acquire) && Instant::now() >= deadline)
            });

        Ok(Self { conn, armed })
    }

    /// Disarm and uninstall the handler before the connection returns to the pool
    pub(crate) async fn release(mut self) {
        self.armed.store(false, Ordering::Release);
        match self.conn.lock_handle().await {
            Ok(mut handle) => handle.remove_progress_handler(),
            Err(e) => warn!(error = %e, "Failed to remove progress handler"),
        }
    }
}

impl Deref for DeadlineConnection {
    type Target = SqliteConnection;

    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl DerefMut for DeadlineConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}

impl Drop for DeadlineConnection {
    fn drop(&mut self) {
        self.armed.store(false, Ordering::Release);
    }
}

/// Whether `err` is SQLite reporting a statement stopped by its progress handler
pub(crate) fn is_interrupted(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            db.code().as_deref() == Some(SQLITE_INTERRUPT) || db.message() == "interrupted"
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use std::time::Duration;

    const COUNT_TO_200K: &str = "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c WHERE x < 200000) SELECT count(*) FROM c";

    #[tokio::test]
    async fn test_statement_before_deadline_completes() {
        let pool = create_test_pool().await.unwrap();
        let conn = pool.acquire().await.unwrap();
        let mut conn = DeadlineConnection::arm(conn, Instant::now() + Duration::from_secs(30))
            .await
            .unwrap();

        let count: i64 = sqlx::query_scalar(COUNT_TO_200K)
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(count, 200_000);
        conn.release().await;
    }

    #[tokio::test]
    async fn test_expired_deadline_interrupts() {
        let pool = create_test_pool().await.unwrap();
        let conn = pool.acquire().await.unwrap();
        let mut conn = DeadlineConnection::arm(conn, Instant::now()).await.unwrap();

        let err = sqlx::query_scalar::<_, i64>(COUNT_TO_200K)
            .fetch_one(&mut *conn)
            .await
            .unwrap_err();
        assert!(is_interrupted(&err), "unexpected error: {err}");
        conn.release().await;
    }

    #[tokio::test]
    async fn test_dropped_guard_no_longer_interrupts() {
        let pool = create_test_pool().await.unwrap();
        let conn = pool.acquire().await.unwrap();
        let guard = DeadlineConnection::arm(conn, Instant::now()).await.unwrap();

        // Dropped without release: the handler stays installed but disarmed
        drop(guard);

        let count: i64 = sqlx::query_scalar(COUNT_TO_200K)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 200_000);
    }

    #[test]
    fn test_other_errors_are_not_interrupts() {
        assert!(!is_interrupted(&sqlx::Error::RowNotFound));
        assert!(!is_interrupted(&sqlx::Error::PoolTimedOut));
    }
}
