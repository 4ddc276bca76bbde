use anyhow::Result;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::comment::Comment;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct CommentService {
    db: Db,
}

impl CommentService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        let rows = sqlx::query(
            "SELECT c.id, c.text, c.created, c.post_id, c.author_id, \
                    u.username AS author_username \
             FROM comments c \
             LEFT JOIN users u ON u.id = c.author_id \
             WHERE c.post_id = $1 \
             ORDER BY c.created, c.id",
        )
        .bind(post_id)
        .fetch_all(self.db.pool())
        .await?;

        let comments = rows
            .iter()
            .map(|row| Comment {
                id: row.get("id"),
                text: row.get("text"),
                created: row.get("created"),
                post_id: row.get("post_id"),
                author_id: row.get("author_id"),
                author_username: row.get("author_username"),
            })
            .collect();

        Ok(comments)
    }

    /// Persists a new comment. `created` comes from the database; `author`
    /// and `post` come from the handler, never from the submitted form.
    pub async fn add(&self, post_id: Uuid, author_id: Uuid, text: &str) -> Result<Comment> {
        let row = sqlx::query(
            "WITH inserted AS ( \
                INSERT INTO comments (text, post_id, author_id) \
                VALUES ($1, $2, $3) \
                RETURNING id, text, created, post_id, author_id \
             ) \
             SELECT c.id, c.text, c.created, c.post_id, c.author_id, \
                    u.username AS author_username \
             FROM inserted c \
             LEFT JOIN users u ON u.id = c.author_id",
        )
        .bind(text)
        .bind(post_id)
        .bind(author_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(Comment {
            id: row.get("id"),
            text: row.get("text"),
            created: row.get("created"),
            post_id: row.get("post_id"),
            author_id: row.get("author_id"),
            author_username: row.get("author_username"),
        })
    }
}
