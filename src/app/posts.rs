use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::post::Post;
use crate::infra::db::Db;

const POST_COLUMNS: &str = "p.id, p.text, p.pub_date, p.author_id, u.username AS author_username, \
     p.group_id, g.title AS group_title, g.slug AS group_slug, p.image_key";

#[derive(Clone)]
pub struct PostService {
    db: Db,
}

impl PostService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn count_all(&self) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    pub async fn list_page(&self, offset: i64, limit: i64) -> Result<Vec<Post>> {
        let rows = sqlx::query(&format!(
            "SELECT {POST_COLUMNS} \
             FROM posts p \
             LEFT JOIN users u ON u.id = p.author_id \
             LEFT JOIN groups g ON g.id = p.group_id \
             ORDER BY p.pub_date DESC, p.id DESC \
             OFFSET $1 LIMIT $2",
        ))
        .bind(offset)
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(post_from_row).collect())
    }

    pub async fn count_by_group(&self, group_id: Uuid) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE group_id = $1")
            .bind(group_id)
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    pub async fn list_by_group(&self, group_id: Uuid, offset: i64, limit: i64) -> Result<Vec<Post>> {
        let rows = sqlx::query(&format!(
            "SELECT {POST_COLUMNS} \
             FROM posts p \
             LEFT JOIN users u ON u.id = p.author_id \
             LEFT JOIN groups g ON g.id = p.group_id \
             WHERE p.group_id = $1 \
             ORDER BY p.pub_date DESC, p.id DESC \
             OFFSET $2 LIMIT $3",
        ))
        .bind(group_id)
        .bind(offset)
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(post_from_row).collect())
    }

    pub async fn count_by_author(&self, author_id: Uuid) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE author_id = $1")
            .bind(author_id)
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    pub async fn list_by_author(
        &self,
        author_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Post>> {
        let rows = sqlx::query(&format!(
            "SELECT {POST_COLUMNS} \
             FROM posts p \
             LEFT JOIN users u ON u.id = p.author_id \
             LEFT JOIN groups g ON g.id = p.group_id \
             WHERE p.author_id = $1 \
             ORDER BY p.pub_date DESC, p.id DESC \
             OFFSET $2 LIMIT $3",
        ))
        .bind(author_id)
        .bind(offset)
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(post_from_row).collect())
    }

    /// Everything published by authors the user follows, newest first.
    pub async fn count_feed(&self, user_id: Uuid) -> Result<i64> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM posts \
             WHERE author_id IN (SELECT author_id FROM follows WHERE user_id = $1)",
        )
        .bind(user_id)
        .fetch_one(self.db.pool())
        .await?;
        Ok(count)
    }

    pub async fn list_feed(&self, user_id: Uuid, offset: i64, limit: i64) -> Result<Vec<Post>> {
        let rows = sqlx::query(&format!(
            "SELECT {POST_COLUMNS} \
             FROM posts p \
             LEFT JOIN users u ON u.id = p.author_id \
             LEFT JOIN groups g ON g.id = p.group_id \
             WHERE p.author_id IN (SELECT author_id FROM follows WHERE user_id = $1) \
             ORDER BY p.pub_date DESC, p.id DESC \
             OFFSET $2 LIMIT $3",
        ))
        .bind(user_id)
        .bind(offset)
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(post_from_row).collect())
    }

    pub async fn get(&self, post_id: Uuid) -> Result<Option<Post>> {
        let row = sqlx::query(&format!(
            "SELECT {POST_COLUMNS} \
             FROM posts p \
             LEFT JOIN users u ON u.id = p.author_id \
             LEFT JOIN groups g ON g.id = p.group_id \
             WHERE p.id = $1",
        ))
        .bind(post_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(post_from_row))
    }

    /// Persists a new post. `pub_date` is assigned by the database, never by
    /// the caller.
    pub async fn create(
        &self,
        author_id: Uuid,
        text: &str,
        group_id: Option<Uuid>,
        image_key: Option<&str>,
    ) -> Result<Post> {
        let row = sqlx::query(&format!(
            "WITH inserted AS ( \
                INSERT INTO posts (text, author_id, group_id, image_key) \
                VALUES ($1, $2, $3, $4) \
                RETURNING id, text, pub_date, author_id, group_id, image_key \
             ) \
             SELECT {POST_COLUMNS} \
             FROM inserted p \
             LEFT JOIN users u ON u.id = p.author_id \
             LEFT JOIN groups g ON g.id = p.group_id",
        ))
        .bind(text)
        .bind(author_id)
        .bind(group_id)
        .bind(image_key)
        .fetch_one(self.db.pool())
        .await?;

        Ok(post_from_row(&row))
    }

    /// Edits text, group and (when a new upload is present) the image.
    /// `pub_date` and `author_id` are deliberately untouched.
    pub async fn update(
        &self,
        post_id: Uuid,
        text: &str,
        group_id: Option<Uuid>,
        image_key: Option<&str>,
    ) -> Result<Option<Post>> {
        let row = sqlx::query(&format!(
            "WITH updated AS ( \
                UPDATE posts \
                SET text = $2, group_id = $3, image_key = COALESCE($4, image_key) \
                WHERE id = $1 \
                RETURNING id, text, pub_date, author_id, group_id, image_key \
             ) \
             SELECT {POST_COLUMNS} \
             FROM updated p \
             LEFT JOIN users u ON u.id = p.author_id \
             LEFT JOIN groups g ON g.id = p.group_id",
        ))
        .bind(post_id)
        .bind(text)
        .bind(group_id)
        .bind(image_key)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(post_from_row))
    }
}

fn post_from_row(row: &PgRow) -> Post {
    Post {
        id: row.get("id"),
        text: row.get("text"),
        pub_date: row.get("pub_date"),
        author_id: row.get("author_id"),
        author_username: row.get("author_username"),
        group_id: row.get("group_id"),
        group_title: row.get("group_title"),
        group_slug: row.get("group_slug"),
        image_key: row.get("image_key"),
    }
}
