use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Characters of text shown when a post stands in for itself (admin lists,
/// logs).
pub const PREVIEW_CHARS: usize = 15;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub pub_date: OffsetDateTime,
    /// None when the author account has been deleted; the post is retained.
    pub author_id: Option<Uuid>,
    pub author_username: Option<String>,
    pub group_id: Option<Uuid>,
    pub group_title: Option<String>,
    pub group_slug: Option<String>,
    /// Object-storage key under the posts/ prefix.
    pub image_key: Option<String>,
}

impl Post {
    pub fn preview(&self) -> String {
        self.text.chars().take(PREVIEW_CHARS).collect()
    }
}

impl std::fmt::Display for Post {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.preview())
    }
}
