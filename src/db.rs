use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

use crate::AppResult;

/// A persisted chat message, in the shape clients receive it.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Message {
    pub sender_id: String,
    pub receiver_id: String,

    #[sqlx(rename = "message")]
    #[serde(rename = "message")]
    pub body: String,

    // assigned by the store, millisecond precision
    pub timestamp: NaiveDateTime,
    pub read: bool,
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    sender_id TEXT NOT NULL,
    receiver_id TEXT NOT NULL,
    message TEXT NOT NULL,
    timestamp TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
    read BOOLEAN NOT NULL DEFAULT FALSE
);
CREATE INDEX IF NOT EXISTS messages_pair_idx ON messages (sender_id, receiver_id);
"#;

#[derive(Clone)]
pub struct MessageStore {
    pool: SqlitePool,
}

impl MessageStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn init_schema(&self) -> AppResult<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    /// Every message exchanged between `a` and `b`, in either direction,
    /// oldest first.
    pub async fn history(&self, a: &str, b: &str) -> AppResult<Vec<Message>> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT sender_id, receiver_id, message, timestamp, read
            FROM messages
            WHERE (sender_id = ?1 AND receiver_id = ?2)
               OR (sender_id = ?2 AND receiver_id = ?1)
            ORDER BY timestamp ASC, id ASC
            "#,
        )
        .bind(a)
        .bind(b)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    pub async fn insert(&self, sender_id: &str, receiver_id: &str, body: &str, read: bool) -> AppResult<Message> {
        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (sender_id, receiver_id, message, read)
            VALUES (?, ?, ?, ?)
            RETURNING sender_id, receiver_id, message, timestamp, read
            "#,
        )
        .bind(sender_id)
        .bind(receiver_id)
        .bind(body)
        .bind(read)
        .fetch_one(&self.pool)
        .await?;

        Ok(message)
    }

    /// Flags everything `sender_id` sent to `receiver_id` as read, whether or
    /// not it already was. Returns the number of rows touched.
    pub async fn mark_read(&self, receiver_id: &str, sender_id: &str) -> AppResult<u64> {
        let result = sqlx::query("UPDATE messages SET read = TRUE WHERE receiver_id = ? AND sender_id = ?")
            .bind(receiver_id)
            .bind(sender_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

/// A fresh in-memory store. A single, never-recycled connection keeps the
/// database alive for the whole test.
#[cfg(test)]
pub(crate) async fn memory_store() -> MessageStore {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let store = MessageStore::new(pool);
    store.init_schema().await.unwrap();
    store
}
