//! Channel repository.

use super::{Channel, DbError};
use sqlx::Row;
use sqlx::SqlitePool;

pub struct ChannelRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ChannelRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn new_channel(&self, name: &str, topic: &str) -> Result<Channel, DbError> {
        let result = sqlx::query("INSERT INTO channels (name, topic) VALUES (?, ?)")
            .bind(name)
            .bind(topic)
            .execute(self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_unique_violation()
                {
                    return DbError::Conflict {
                        entity: "channel",
                        name: name.to_string(),
                    };
                }
                DbError::from(e)
            })?;

        Ok(Channel {
            id: result.last_insert_rowid(),
            name: name.to_string(),
            topic: topic.to_string(),
        })
    }

    pub async fn delete_by_name(&self, name: &str) -> Result<(), DbError> {
        sqlx::query("DELETE FROM channels WHERE name = ?")
            .bind(name)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete_by_id(&self, id: i64) -> Result<(), DbError> {
        sqlx::query("DELETE FROM channels WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<Channel>, DbError> {
        let rows = sqlx::query("SELECT id, name, topic FROM channels ORDER BY name")
            .fetch_all(self.pool)
            .await?;
        Ok(rows.iter().map(row_to_channel).collect())
    }

    pub async fn exists(&self, name: &str) -> Result<bool, DbError> {
        Ok(self.find_by_name(name).await?.is_some())
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Channel>, DbError> {
        let row = sqlx::query("SELECT id, name, topic FROM channels WHERE name = ?")
            .bind(name)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_channel))
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Channel>, DbError> {
        let row = sqlx::query("SELECT id, name, topic FROM channels WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_channel))
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Channel, DbError> {
        self.find_by_name(name).await?.ok_or_else(|| DbError::NotFound {
            entity: "channel",
            name: name.to_string(),
        })
    }

    pub async fn set_topic(&self, name: &str, topic: &str) -> Result<(), DbError> {
        let result = sqlx::query("UPDATE channels SET topic = ? WHERE name = ?")
            .bind(topic)
            .bind(name)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound {
                entity: "channel",
                name: name.to_string(),
            });
        }
        Ok(())
    }
}

fn row_to_channel(row: &sqlx::sqlite::SqliteRow) -> Channel {
    Channel {
        id: row.get("id"),
        name: row.get("name"),
        topic: row.get("topic"),
    }
}
