use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::user::UserProfile;

/// Placeholder title for records stored without one.
pub const UNTITLED_POST: &str = "Untitled Post";

/// Placeholder author name for records stored without an author snapshot.
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

/// Lifecycle status of a post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Draft,
    Published,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PostStatus::Draft),
            "published" => Ok(PostStatus::Published),
            other => Err(format!("unknown post status '{other}'")),
        }
    }
}

/// Author fields copied onto a post or comment at write time.
///
/// The snapshot is never refreshed, so it can lag behind the live profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorSnapshot {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl From<&UserProfile> for AuthorSnapshot {
    fn from(user: &UserProfile) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            avatar_url: user.avatar_url.clone(),
        }
    }
}

/// Post entity - a blog post, either a draft or published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub status: PostStatus,
    pub author: AuthorSnapshot,
    pub author_id: String,
    /// Denormalized; not updated when comments come and go.
    pub comment_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_at: Option<DateTime<Utc>>,
}

impl Post {
    pub fn is_published(&self) -> bool {
        self.status == PostStatus::Published
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.author_id == user_id
    }
}

/// Fields accepted from the compose form when creating a post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewPost {
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub status: PostStatus,
    pub image_url: Option<String>,
}

/// Partial update of a post. `None` leaves the stored field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostPatch {
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub categories: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub status: Option<PostStatus>,
    pub image_url: Option<String>,
}

impl PostPatch {
    /// Patch that only changes the status.
    pub fn status(status: PostStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.excerpt.is_none()
            && self.content.is_none()
            && self.categories.is_none()
            && self.tags.is_none()
            && self.status.is_none()
            && self.image_url.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_str() {
        assert_eq!("draft".parse::<PostStatus>(), Ok(PostStatus::Draft));
        assert_eq!("published".parse::<PostStatus>(), Ok(PostStatus::Published));
        assert!("archived".parse::<PostStatus>().is_err());
        assert_eq!(PostStatus::Published.to_string(), "published");
    }

    #[test]
    fn test_status_patch_only_sets_status() {
        let patch = PostPatch::status(PostStatus::Published);
        assert_eq!(patch.status, Some(PostStatus::Published));
        assert!(patch.title.is_none());
        assert!(!patch.is_empty());
        assert!(PostPatch::default().is_empty());
    }
}
