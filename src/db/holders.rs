//! Group holder repository. A holder binds a group's flags to a (user,
//! channel) scope; `None` on either side is the NULL wildcard.

use super::{DbError, GroupHolder};
use sqlx::Row;
use sqlx::SqlitePool;

pub struct HolderRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> HolderRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// `user`/`channel` of `None` are persisted as NULL (the "anyone"/"any
    /// channel" wildcard); the named group must exist, and named
    /// user/channel, when given, must exist too.
    pub async fn add(
        &self,
        group: &str,
        user: Option<&str>,
        channel: Option<&str>,
    ) -> Result<i64, DbError> {
        let group_id: i64 = sqlx::query_scalar("SELECT id FROM groups WHERE name = ?")
            .bind(group)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound {
                entity: "group",
                name: group.to_string(),
            })?;

        let user_id = match user {
            Some(name) => Some(
                sqlx::query_scalar::<_, i64>("SELECT id FROM accounts WHERE username = ?")
                    .bind(name)
                    .fetch_optional(self.pool)
                    .await?
                    .ok_or_else(|| DbError::NotFound {
                        entity: "account",
                        name: name.to_string(),
                    })?,
            ),
            None => None,
        };

        let channel_id = match channel {
            Some(name) => Some(
                sqlx::query_scalar::<_, i64>("SELECT id FROM channels WHERE name = ?")
                    .bind(name)
                    .fetch_optional(self.pool)
                    .await?
                    .ok_or_else(|| DbError::NotFound {
                        entity: "channel",
                        name: name.to_string(),
                    })?,
            ),
            None => None,
        };

        let result = sqlx::query(
            "INSERT INTO group_holders (group_id, user_id, channel_id) VALUES (?, ?, ?)",
        )
        .bind(group_id)
        .bind(user_id)
        .bind(channel_id)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return DbError::Conflict {
                    entity: "group-holder",
                    name: group.to_string(),
                };
            }
            DbError::from(e)
        })?;

        Ok(result.last_insert_rowid())
    }

    pub async fn delete(&self, id: i64) -> Result<(), DbError> {
        sqlx::query("DELETE FROM group_holders WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Deletes holders matching a template; `None` fields act as wildcards
    /// over the delete itself, not over the NULL-scope matching rules —
    /// only rows whose own scope equals the template are removed.
    pub async fn delete_by_template(
        &self,
        group: &str,
        user: Option<&str>,
        channel: Option<&str>,
    ) -> Result<u64, DbError> {
        let group_id: i64 = sqlx::query_scalar("SELECT id FROM groups WHERE name = ?")
            .bind(group)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound {
                entity: "group",
                name: group.to_string(),
            })?;

        let user_id: Option<i64> = match user {
            Some(name) => sqlx::query_scalar("SELECT id FROM accounts WHERE username = ?")
                .bind(name)
                .fetch_optional(self.pool)
                .await?,
            None => None,
        };
        let channel_id: Option<i64> = match channel {
            Some(name) => sqlx::query_scalar("SELECT id FROM channels WHERE name = ?")
                .bind(name)
                .fetch_optional(self.pool)
                .await?,
            None => None,
        };

        let result = sqlx::query(
            "DELETE FROM group_holders WHERE group_id = ? \
             AND user_id IS ? AND channel_id IS ?",
        )
        .bind(group_id)
        .bind(user_id)
        .bind(channel_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn list(&self) -> Result<Vec<GroupHolder>, DbError> {
        let rows = sqlx::query("SELECT id, group_id, user_id, channel_id FROM group_holders")
            .fetch_all(self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(|row| GroupHolder {
                id: row.get("id"),
                group_id: row.get("group_id"),
                user_id: row.get("user_id"),
                channel_id: row.get("channel_id"),
            })
            .collect())
    }
}
