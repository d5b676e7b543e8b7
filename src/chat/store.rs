//! Durable message log. Source of truth for history and read state.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use sqlx::SqlitePool;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// The backing database could not complete the operation. Never retried
/// here; the caller decides what to do (for `persist`, that means no
/// delivery of the unpersisted message).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("message store unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),
}

/// One side of a conversation as returned by `history`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub sender: String,
    pub body: String,
    pub created_at: String,
    pub is_read: bool,
}

#[derive(Clone)]
pub struct MessageStore {
    pool: SqlitePool,
    /// Last timestamp handed out, in unix milliseconds. Persist clamps to
    /// this so assigned timestamps never go backwards within one store even
    /// if the wall clock does.
    last_ts: Arc<Mutex<i64>>,
}

impl MessageStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool, last_ts: Arc::new(Mutex::new(0)) }
    }

    /// Append a message and return its assigned creation time (unix
    /// milliseconds, monotone per store).
    pub async fn persist(
        &self,
        sender: &str,
        receiver: &str,
        body: &str,
    ) -> Result<i64, StoreError> {
        let created_at = self.next_timestamp();
        sqlx::query("INSERT INTO messages (sender, receiver, body, created_at) VALUES (?, ?, ?, ?)")
            .bind(sender)
            .bind(receiver)
            .bind(body)
            .bind(created_at)
            .execute(&self.pool)
            .await?;
        Ok(created_at)
    }

    /// Both directions of the conversation between `a` and `b`, oldest
    /// first. Symmetric in its arguments.
    pub async fn history(&self, a: &str, b: &str) -> Result<Vec<HistoryEntry>, StoreError> {
        let rows: Vec<(String, String, i64, bool)> = sqlx::query_as(
            r#"
            SELECT sender, body, created_at, is_read
            FROM messages
            WHERE (sender = ? AND receiver = ?) OR (sender = ? AND receiver = ?)
            ORDER BY id
            "#,
        )
        .bind(a)
        .bind(b)
        .bind(b)
        .bind(a)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(sender, body, created_at, is_read)| HistoryEntry {
                sender,
                body,
                created_at: format_timestamp(created_at),
                is_read,
            })
            .collect())
    }

    /// Mark everything `from` sent `to` as read. Returns how many messages
    /// flipped; calling again without new traffic is a no-op returning 0.
    pub async fn mark_read(&self, from: &str, to: &str) -> Result<u64, StoreError> {
        let result =
            sqlx::query("UPDATE messages SET is_read = 1 WHERE sender = ? AND receiver = ? AND is_read = 0")
                .bind(from)
                .bind(to)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    fn next_timestamp(&self) -> i64 {
        let now = (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64;
        let mut last = self.last_ts.lock();
        let ts = now.max(*last);
        *last = ts;
        ts
    }
}

/// Unix milliseconds to RFC 3339. Stored values always fit the valid range;
/// if one somehow does not, the raw number is still readable.
pub fn format_timestamp(millis: i64) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
        .ok()
        .and_then(|ts| ts.format(&Rfc3339).ok())
        .unwrap_or_else(|| millis.to_string())
}
