//! Account repository.

use super::{Account, DbError};
use sqlx::SqlitePool;
use sqlx::Row;

pub struct AccountRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AccountRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// True iff at least one account already exists (callers grant the
    /// bootstrap owner flag when this is false).
    pub async fn has_any(&self) -> Result<bool, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts")
            .fetch_one(self.pool)
            .await?;
        Ok(count > 0)
    }

    pub async fn register(
        &self,
        username: &str,
        passhash: &str,
        owner: bool,
        ip: &str,
    ) -> Result<Account, DbError> {
        let result = sqlx::query(
            "INSERT INTO accounts (username, passhash, owner, banned, ip) VALUES (?, ?, ?, 0, ?)",
        )
        .bind(username)
        .bind(passhash)
        .bind(owner)
        .bind(ip)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return DbError::Conflict {
                    entity: "account",
                    name: username.to_string(),
                };
            }
            DbError::from(e)
        })?;

        Ok(Account {
            id: result.last_insert_rowid(),
            username: username.to_string(),
            passhash: passhash.to_string(),
            owner,
            banned: false,
            ip: ip.to_string(),
        })
    }

    pub async fn delete_by_name(&self, username: &str) -> Result<(), DbError> {
        sqlx::query("DELETE FROM accounts WHERE username = ?")
            .bind(username)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    pub async fn get_id(&self, username: &str) -> Result<i64, DbError> {
        sqlx::query_scalar("SELECT id FROM accounts WHERE username = ?")
            .bind(username)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound {
                entity: "account",
                name: username.to_string(),
            })
    }

    pub async fn get(&self, id: i64) -> Result<Account, DbError> {
        let row = sqlx::query("SELECT id, username, passhash, owner, banned, ip FROM accounts WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound {
                entity: "account",
                name: id.to_string(),
            })?;
        Ok(row_to_account(&row))
    }

    pub async fn find_by_name(&self, username: &str) -> Result<Option<Account>, DbError> {
        let row = sqlx::query(
            "SELECT id, username, passhash, owner, banned, ip FROM accounts WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.as_ref().map(row_to_account))
    }

    pub async fn exists(&self, username: &str) -> Result<bool, DbError> {
        Ok(self.find_by_name(username).await?.is_some())
    }

    pub async fn check_password(&self, username: &str, passhash: &str) -> Result<bool, DbError> {
        let account = self
            .find_by_name(username)
            .await?
            .ok_or_else(|| DbError::NotFound {
                entity: "account",
                name: username.to_string(),
            })?;
        Ok(account.passhash == passhash)
    }

    pub async fn is_owner(&self, username: &str) -> Result<bool, DbError> {
        Ok(sqlx::query_scalar("SELECT owner FROM accounts WHERE username = ?")
            .bind(username)
            .fetch_optional(self.pool)
            .await?
            .unwrap_or(false))
    }

    pub async fn set_owner(&self, username: &str, owner: bool) -> Result<(), DbError> {
        sqlx::query("UPDATE accounts SET owner = ? WHERE username = ?")
            .bind(owner)
            .bind(username)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    pub async fn ban(&self, username: &str) -> Result<(), DbError> {
        sqlx::query("UPDATE accounts SET banned = 1 WHERE username = ?")
            .bind(username)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    pub async fn is_banned(&self, username: &str, ip: &str) -> Result<bool, DbError> {
        let banned_by_name: Option<bool> =
            sqlx::query_scalar("SELECT banned FROM accounts WHERE username = ?")
                .bind(username)
                .fetch_optional(self.pool)
                .await?;
        if banned_by_name.unwrap_or(false) {
            return Ok(true);
        }
        if ip.is_empty() {
            return Ok(false);
        }
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE ip = ? AND banned = 1")
            .bind(ip)
            .fetch_one(self.pool)
            .await?;
        Ok(count > 0)
    }

    pub async fn count_by_ip(&self, ip: &str) -> Result<i64, DbError> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE ip = ?")
            .bind(ip)
            .fetch_one(self.pool)
            .await?)
    }

    /// Non-banned accounts, for `list-users`.
    pub async fn list(&self) -> Result<Vec<Account>, DbError> {
        let rows = sqlx::query(
            "SELECT id, username, passhash, owner, banned, ip FROM accounts WHERE banned = 0 ORDER BY username",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows.iter().map(row_to_account).collect())
    }
}

fn row_to_account(row: &sqlx::sqlite::SqliteRow) -> Account {
    Account {
        id: row.get("id"),
        username: row.get("username"),
        passhash: row.get("passhash"),
        owner: row.get("owner"),
        banned: row.get("banned"),
        ip: row.get("ip"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    async fn db() -> Database {
        Database::connect(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn register_and_lookup() {
        let db = db().await;
        let acc = db
            .accounts()
            .register("root", "deadbeef", true, "127.0.0.1")
            .await
            .unwrap();
        assert_eq!(acc.username, "root");
        assert!(acc.owner);

        assert!(db.accounts().exists("root").await.unwrap());
        assert!(db.accounts().check_password("root", "deadbeef").await.unwrap());
        assert!(!db.accounts().check_password("root", "wrong").await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let db = db().await;
        db.accounts().register("u", "h", false, "").await.unwrap();
        let err = db.accounts().register("u", "h2", false, "").await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));
    }

    #[tokio::test]
    async fn has_any_and_ban() {
        let db = db().await;
        assert!(!db.accounts().has_any().await.unwrap());
        db.accounts().register("u", "h", false, "1.2.3.4").await.unwrap();
        assert!(db.accounts().has_any().await.unwrap());

        assert!(!db.accounts().is_banned("u", "1.2.3.4").await.unwrap());
        db.accounts().ban("u").await.unwrap();
        assert!(db.accounts().is_banned("u", "9.9.9.9").await.unwrap());
    }
}
