//! Record normalizer - raw store records into domain entities.
//!
//! Nothing here fails. Partial or malformed records come out complete, with
//! documented defaults, and every substitution that loses information is
//! reported through `tracing::warn!`.

use chrono::{DateTime, Utc};

use crate::domain::{AuthorSnapshot, Comment, Post, RawTimestamp, UNKNOWN_AUTHOR, UNTITLED_POST};
use crate::records::{AuthorRecord, CommentRecord, PostRecord};

const UNKNOWN_ID: &str = "unknown";
const ANONYMOUS: &str = "Anonymous";

/// Coerce a stored timestamp, falling back to the current time.
pub fn coerce_timestamp(record_id: &str, raw: Option<&RawTimestamp>) -> DateTime<Utc> {
    match raw {
        Some(raw) => match raw.to_datetime() {
            Some(at) => at,
            None => {
                tracing::warn!(
                    record_id = %record_id,
                    raw = ?raw,
                    "Unparseable timestamp, using current time"
                );
                Utc::now()
            }
        },
        None => {
            tracing::warn!(record_id = %record_id, "Missing timestamp, using current time");
            Utc::now()
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn snapshot(author: Option<AuthorRecord>, fallback_id: Option<&str>, fallback_name: &str) -> AuthorSnapshot {
    let author = author.unwrap_or_default();
    AuthorSnapshot {
        id: non_empty(author.id)
            .or_else(|| fallback_id.filter(|id| !id.is_empty()).map(String::from))
            .unwrap_or_else(|| UNKNOWN_ID.to_string()),
        name: non_empty(author.name).unwrap_or_else(|| fallback_name.to_string()),
        avatar_url: non_empty(author.avatar_url),
    }
}

/// Build a [`Post`] from a stored record.
pub fn normalize_post(id: &str, record: PostRecord) -> Post {
    let timestamp = coerce_timestamp(id, record.timestamp.as_ref());
    let last_modified_at = record
        .last_modified_at
        .as_ref()
        .and_then(RawTimestamp::to_datetime);
    let author_id = non_empty(record.author_id);
    let author = snapshot(record.author, author_id.as_deref(), UNKNOWN_AUTHOR);

    Post {
        id: id.to_string(),
        title: non_empty(record.title).unwrap_or_else(|| UNTITLED_POST.to_string()),
        excerpt: record.excerpt.unwrap_or_default(),
        content: record.content.unwrap_or_default(),
        categories: record.categories.unwrap_or_default(),
        tags: record.tags.unwrap_or_default(),
        image_url: non_empty(record.image_url),
        timestamp,
        status: record.status.unwrap_or_default(),
        author,
        author_id: author_id.unwrap_or_else(|| UNKNOWN_ID.to_string()),
        comment_count: record.comment_count.unwrap_or(0),
        last_modified_at,
    }
}

/// Build a [`Comment`] from a stored record.
pub fn normalize_comment(post_id: &str, id: &str, record: CommentRecord) -> Comment {
    Comment {
        id: id.to_string(),
        post_id: post_id.to_string(),
        content: record.content.unwrap_or_default(),
        timestamp: coerce_timestamp(id, record.timestamp.as_ref()),
        user: snapshot(record.user, record.user_id.as_deref(), ANONYMOUS),
    }
}

/// Newest first. Stable, so equal timestamps keep store order.
pub fn sort_posts(posts: &mut [Post]) {
    posts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

/// Newest first.
pub fn sort_comments(comments: &mut [Comment]) {
    comments.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}
