//! Flag repository: owns both the group_flags table (flag definitions) and
//! the scope-matching query that the permission resolver builds on.

use super::DbError;
use serde_json::Value;
use sqlx::Row;
use sqlx::SqlitePool;

use super::models::{FlagQueryResult, GroupHolder};

/// A flag definition, identified by the (group, name) pair it is upserted on.
pub struct Flag {
    pub group: String,
    pub name: String,
    pub flag: Value,
}

pub struct FlagRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FlagRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Upsert by (group, name); returns the flag row id.
    pub async fn set(&self, flag: &Flag) -> Result<i64, DbError> {
        let group_id: i64 = sqlx::query_scalar("SELECT id FROM groups WHERE name = ?")
            .bind(&flag.group)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound {
                entity: "group",
                name: flag.group.clone(),
            })?;

        let body = flag.flag.to_string();

        if let Some(id) = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM group_flags WHERE group_id = ? AND name = ?",
        )
        .bind(group_id)
        .bind(&flag.name)
        .fetch_optional(self.pool)
        .await?
        {
            sqlx::query("UPDATE group_flags SET flag = ? WHERE id = ?")
                .bind(&body)
                .bind(id)
                .execute(self.pool)
                .await?;
            Ok(id)
        } else {
            let result = sqlx::query("INSERT INTO group_flags (group_id, name, flag) VALUES (?, ?, ?)")
                .bind(group_id)
                .bind(&flag.name)
                .bind(&body)
                .execute(self.pool)
                .await?;
            Ok(result.last_insert_rowid())
        }
    }

    pub async fn delete(&self, group: &str, name: &str) -> Result<(), DbError> {
        let group_id: i64 = sqlx::query_scalar("SELECT id FROM groups WHERE name = ?")
            .bind(group)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound {
                entity: "group",
                name: group.to_string(),
            })?;
        sqlx::query("DELETE FROM group_flags WHERE group_id = ? AND name = ?")
            .bind(group_id)
            .bind(name)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Resolves the scope-matching query described by the permission
    /// resolver. `user`/`channel`/`group`/`flag` of `None` mean "match any"
    /// along that dimension. `strict=false` is the relaxed,
    /// admin-introspection variant used by `get-group-holders`: a holder
    /// qualifies if its scope touches the requested user or channel at all,
    /// without the NULL-wildcard fallbacks strict matching applies.
    pub async fn query(
        &self,
        user: Option<&str>,
        channel: Option<&str>,
        group: Option<&str>,
        flag: Option<&str>,
        strict: bool,
    ) -> Result<Vec<FlagQueryResult>, DbError> {
        let user_id = match user {
            Some(name) if !name.is_empty() => Some(
                sqlx::query_scalar::<_, i64>("SELECT id FROM accounts WHERE username = ?")
                    .bind(name)
                    .fetch_optional(self.pool)
                    .await?
                    .ok_or_else(|| DbError::NotFound {
                        entity: "account",
                        name: name.to_string(),
                    })?,
            ),
            _ => None,
        };
        // A channel name that doesn't exist yet (e.g. the target of
        // `new-channel`) can still be granted by a global or user-wildcard
        // holder; it just can never satisfy an exact or channel-wildcard
        // holder scoped to a real channel. Rather than erroring, resolve it
        // to a sentinel id no real channel row can ever equal, so the
        // NULL-fallback match below still lets the wildcard holders through.
        let channel_id = match channel {
            Some(name) if !name.is_empty() => Some(
                sqlx::query_scalar::<_, i64>("SELECT id FROM channels WHERE name = ?")
                    .bind(name)
                    .fetch_optional(self.pool)
                    .await?
                    .unwrap_or(-1),
            ),
            _ => None,
        };
        let group_id = match group {
            Some(name) if !name.is_empty() => Some(
                sqlx::query_scalar::<_, i64>("SELECT id FROM groups WHERE name = ?")
                    .bind(name)
                    .fetch_optional(self.pool)
                    .await?
                    .ok_or_else(|| DbError::NotFound {
                        entity: "group",
                        name: name.to_string(),
                    })?,
            ),
            _ => None,
        };

        let rows = sqlx::query(
            "SELECT h.id AS holder_id, h.group_id, h.user_id, h.channel_id, \
                    g.name AS group_name, f.id AS flag_id, f.name AS flag_name, f.flag \
             FROM group_holders h \
             JOIN groups g ON g.id = h.group_id \
             JOIN group_flags f ON f.group_id = h.group_id \
             WHERE (? IS NULL OR h.group_id = ?) \
               AND (? IS NULL OR f.name = ?)",
        )
        .bind(group_id)
        .bind(group_id)
        .bind(flag.filter(|f| !f.is_empty()))
        .bind(flag.filter(|f| !f.is_empty()))
        .fetch_all(self.pool)
        .await?;

        let mut results = Vec::new();
        for row in rows {
            let holder_user_id: Option<i64> = row.get("user_id");
            let holder_channel_id: Option<i64> = row.get("channel_id");

            let matches = if strict {
                (user_id.is_none() || holder_user_id.is_none() || holder_user_id == user_id)
                    && (channel_id.is_none() || holder_channel_id.is_none() || holder_channel_id == channel_id)
            } else {
                (user_id.is_none() && channel_id.is_none())
                    || (user_id.is_some() && holder_user_id == user_id)
                    || (channel_id.is_some() && holder_channel_id == channel_id)
            };
            if !matches {
                continue;
            }

            let flag_body: String = row.get("flag");
            let flag_value: Value = serde_json::from_str(&flag_body).unwrap_or(Value::Null);

            results.push(FlagQueryResult {
                holder: GroupHolder {
                    id: row.get("holder_id"),
                    group_id: row.get("group_id"),
                    user_id: holder_user_id,
                    channel_id: holder_channel_id,
                },
                group_name: row.get("group_name"),
                flag_id: row.get("flag_id"),
                flag_name: row.get("flag_name"),
                flag: flag_value,
            });
        }

        Ok(results)
    }
}
