use crate::db::{Database, DbError, FlagQueryResult};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PermError {
    #[error("no such {entity}: {name}")]
    NotFound { entity: &'static str, name: String },
    #[error(transparent)]
    Store(#[from] DbError),
}

/// Resolves `(user, channel, flag)` queries against the store's group/holder
/// graph, applying the owner bypass before ever touching the flag tables.
pub struct PermResolver<'a> {
    db: &'a Database,
}

impl<'a> PermResolver<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// True iff `user` holds `flag` on `channel` (empty strings mean
    /// "anyone"/"globally"). Owner accounts always pass.
    pub async fn has_perm(&self, user: &str, channel: &str, flag: &str) -> Result<bool, PermError> {
        if !user.is_empty() && self.db.accounts().is_owner(user).await.map_err(PermError::Store)? {
            return Ok(true);
        }
        let user_arg = Some(user).filter(|s| !s.is_empty());
        let channel_arg = Some(channel).filter(|s| !s.is_empty());
        let flag_arg = Some(flag).filter(|s| !s.is_empty());
        let rows = self
            .db
            .flags()
            .query(user_arg, channel_arg, None, flag_arg, true)
            .await
            .map_err(PermError::Store)?;
        Ok(!rows.is_empty())
    }

    /// Same as `has_perm` but scoped by channel id rather than name, for
    /// handlers that already have the channel row in hand (e.g.
    /// `get-messages`, `delete-message`).
    pub async fn has_perm_by_channel_id(
        &self,
        user: &str,
        channel_id: i64,
        flag: &str,
    ) -> Result<bool, PermError> {
        let channel = self
            .db
            .channels()
            .find_by_id(channel_id)
            .await
            .map_err(PermError::Store)?
            .ok_or_else(|| PermError::NotFound {
                entity: "channel",
                name: channel_id.to_string(),
            })?;
        self.has_perm(user, &channel.name, flag).await
    }

    /// Returns every matching holder row, annotated, for admin
    /// introspection (`get-group-holders`). `strict=false` is the relaxed
    /// matching variant.
    pub async fn list_holders(
        &self,
        user: Option<&str>,
        channel: Option<&str>,
        group: Option<&str>,
        flag: Option<&str>,
        strict: bool,
    ) -> Result<Vec<FlagQueryResult>, PermError> {
        Ok(self
            .db
            .flags()
            .query(user, channel, group, flag, strict)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Flag;
    use serde_json::json;

    #[tokio::test]
    async fn owner_bypasses_everything() {
        let db = Database::connect(":memory:").await.unwrap();
        db.accounts().register("root", "h", true, "").await.unwrap();
        let resolver = PermResolver::new(&db);
        assert!(resolver.has_perm("root", "nonexistent-channel", "perms.new-channel").await.unwrap());
    }

    #[tokio::test]
    async fn non_owner_without_holder_is_denied() {
        let db = Database::connect(":memory:").await.unwrap();
        db.accounts().register("u", "h", false, "").await.unwrap();
        db.channels().new_channel("g", "").await.unwrap();
        let resolver = PermResolver::new(&db);
        assert!(!resolver.has_perm("u", "g", "perms.new-channel").await.unwrap());
    }

    #[tokio::test]
    async fn global_holder_grants_flag_to_non_owner() {
        let db = Database::connect(":memory:").await.unwrap();
        db.accounts().register("u", "h", false, "").await.unwrap();
        db.channels().new_channel("g", "").await.unwrap();
        db.groups().add("posters").await.unwrap();
        db.flags()
            .set(&Flag {
                group: "posters".into(),
                name: "perms.post-message".into(),
                flag: json!(true),
            })
            .await
            .unwrap();
        db.holders().add("posters", None, None).await.unwrap();

        let resolver = PermResolver::new(&db);
        assert!(resolver.has_perm("u", "g", "perms.post-message").await.unwrap());
    }
}
