use anyhow::Result;
use uuid::Uuid;

use crate::infra::db::Db;

#[derive(Clone)]
pub struct FollowService {
    db: Db,
}

impl FollowService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Creates the `(user, author)` edge if absent. Self-follows and
    /// duplicates fall through the INSERT without an error; concurrency
    /// safety comes from the table's primary key, not an application lock.
    pub async fn follow(&self, user_id: Uuid, author_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO follows (user_id, author_id) \
             SELECT $1, $2 \
             WHERE $1 <> $2 \
             ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(author_id)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn unfollow(&self, user_id: Uuid, author_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM follows WHERE user_id = $1 AND author_id = $2",
        )
        .bind(user_id)
        .bind(author_id)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn is_following(&self, user_id: Uuid, author_id: Uuid) -> Result<bool> {
        let following = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM follows WHERE user_id = $1 AND author_id = $2)",
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(following)
    }
}
