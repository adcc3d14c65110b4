use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::post::AuthorSnapshot;

/// Comment entity - lives under exactly one post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub user: AuthorSnapshot,
}

impl Comment {
    pub fn is_authored_by(&self, user_id: &str) -> bool {
        self.user.id == user_id
    }
}
