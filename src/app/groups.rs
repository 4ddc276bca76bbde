use anyhow::Result;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::group::Group;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct GroupService {
    db: Db,
}

impl GroupService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Group>> {
        let row = sqlx::query(
            "SELECT id, title, slug, description FROM groups WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|row| Group {
            id: row.get("id"),
            title: row.get("title"),
            slug: row.get("slug"),
            description: row.get("description"),
        }))
    }

    pub async fn get(&self, group_id: Uuid) -> Result<Option<Group>> {
        let row = sqlx::query(
            "SELECT id, title, slug, description FROM groups WHERE id = $1",
        )
        .bind(group_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|row| Group {
            id: row.get("id"),
            title: row.get("title"),
            slug: row.get("slug"),
            description: row.get("description"),
        }))
    }
}
