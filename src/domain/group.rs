use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named category that posts may belong to. Groups are created out of
/// band (admin tooling, fixtures); no end-user flow mutates them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl std::fmt::Display for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.title)
    }
}
