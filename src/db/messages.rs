//! Message repository.

use super::{ChatMessage, DbError};
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::SqlitePool;

pub struct MessageRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> MessageRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn post(
        &self,
        channel_name: &str,
        content: &str,
        pings: Vec<String>,
        author_name: &str,
    ) -> Result<ChatMessage, DbError> {
        let channel_id: i64 = sqlx::query_scalar("SELECT id FROM channels WHERE name = ?")
            .bind(channel_name)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound {
                entity: "channel",
                name: channel_name.to_string(),
            })?;
        let author_id: i64 = sqlx::query_scalar("SELECT id FROM accounts WHERE username = ?")
            .bind(author_name)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound {
                entity: "account",
                name: author_name.to_string(),
            })?;
        self.post_by_channel_id(channel_id, content, pings, author_id).await
    }

    pub async fn post_by_channel_id(
        &self,
        channel_id: i64,
        content: &str,
        pings: Vec<String>,
        author_id: i64,
    ) -> Result<ChatMessage, DbError> {
        let timestamp = Utc::now();
        let pings_json = serde_json::to_string(&pings).unwrap_or_else(|_| "[]".to_string());

        let result = sqlx::query(
            "INSERT INTO chat_messages (channel_id, author_id, content, timestamp, pings) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(channel_id)
        .bind(author_id)
        .bind(content)
        .bind(timestamp.to_rfc3339())
        .bind(pings_json)
        .execute(self.pool)
        .await?;

        Ok(ChatMessage {
            id: result.last_insert_rowid(),
            channel_id,
            author_id,
            content: content.to_string(),
            timestamp,
            pings,
        })
    }

    pub async fn delete(&self, id: i64) -> Result<(), DbError> {
        sqlx::query("DELETE FROM chat_messages WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Up to `amount` messages strictly older than `before_id`, descending by id.
    pub async fn get(
        &self,
        channel_id: i64,
        before_id: i64,
        amount: i64,
    ) -> Result<Vec<ChatMessage>, DbError> {
        let rows = sqlx::query(
            "SELECT id, channel_id, author_id, content, timestamp, pings FROM chat_messages \
             WHERE channel_id = ? AND id < ? ORDER BY id DESC LIMIT ?",
        )
        .bind(channel_id)
        .bind(before_id)
        .bind(amount)
        .fetch_all(self.pool)
        .await?;
        rows.iter().map(row_to_message).collect()
    }

    /// Returns the owning channel's name alongside the message.
    pub async fn details(&self, id: i64) -> Result<(String, ChatMessage), DbError> {
        let row = sqlx::query(
            "SELECT m.id, m.channel_id, m.author_id, m.content, m.timestamp, m.pings, c.name AS channel_name \
             FROM chat_messages m JOIN channels c ON c.id = m.channel_id WHERE m.id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::NotFound {
            entity: "message",
            name: id.to_string(),
        })?;
        let channel_name: String = row.get("channel_name");
        Ok((channel_name, row_to_message(&row)?))
    }

    pub async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM chat_messages WHERE timestamp < ?")
            .bind(cutoff.to_rfc3339())
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Result<ChatMessage, DbError> {
    let timestamp_str: String = row.get("timestamp");
    let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::Sqlx(sqlx::Error::Decode(Box::new(e))))?;
    let pings_str: String = row.get("pings");
    let pings: Vec<String> = serde_json::from_str(&pings_str).unwrap_or_default();

    Ok(ChatMessage {
        id: row.get("id"),
        channel_id: row.get("channel_id"),
        author_id: row.get("author_id"),
        content: row.get("content"),
        timestamp,
        pings,
    })
}
