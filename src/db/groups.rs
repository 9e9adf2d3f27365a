//! Group repository. Groups are the unit of permission grouping: a group
//! owns zero or more flags and zero or more holders, and a holder binds the
//! group's flags to a (user, channel) scope.

use super::DbError;
use sqlx::SqlitePool;

pub struct GroupRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> GroupRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn add(&self, name: &str) -> Result<i64, DbError> {
        let result = sqlx::query("INSERT INTO groups (name) VALUES (?)")
            .bind(name)
            .execute(self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_unique_violation()
                {
                    return DbError::Conflict {
                        entity: "group",
                        name: name.to_string(),
                    };
                }
                DbError::from(e)
            })?;
        Ok(result.last_insert_rowid())
    }

    pub async fn delete(&self, name: &str) -> Result<(), DbError> {
        sqlx::query("DELETE FROM groups WHERE name = ?")
            .bind(name)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    pub async fn exists(&self, name: &str) -> Result<bool, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM groups WHERE name = ?")
            .bind(name)
            .fetch_one(self.pool)
            .await?;
        Ok(count > 0)
    }

    pub async fn get_id(&self, name: &str) -> Result<i64, DbError> {
        sqlx::query_scalar("SELECT id FROM groups WHERE name = ?")
            .bind(name)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound {
                entity: "group",
                name: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[tokio::test]
    async fn add_delete_exists() {
        let db = Database::connect(":memory:").await.unwrap();
        db.groups().add("admins").await.unwrap();
        assert!(db.groups().exists("admins").await.unwrap());

        let err = db.groups().add("admins").await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));

        db.groups().delete("admins").await.unwrap();
        assert!(!db.groups().exists("admins").await.unwrap());
    }
}
