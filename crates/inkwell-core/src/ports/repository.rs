use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{PostPatch, PostStatus};
use crate::error::RepoError;
use crate::records::{CommentRecord, PostRecord, ProfilePatch, ProfileRecord, Stored};

use super::Subscription;

/// Receives the full comment snapshot of one post on every change.
pub type CommentListener = Arc<dyn Fn(Vec<Stored<CommentRecord>>) + Send + Sync>;

/// Equality filters over the `posts` collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostQuery {
    pub status: Option<PostStatus>,
    pub author_id: Option<String>,
}

impl PostQuery {
    /// Every post.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_status(status: PostStatus) -> Self {
        Self {
            status: Some(status),
            author_id: None,
        }
    }

    pub fn by_author(author_id: impl Into<String>, status: PostStatus) -> Self {
        Self {
            status: Some(status),
            author_id: Some(author_id.into()),
        }
    }

    /// Exact field match, as a document store evaluates it: a record that
    /// lacks a filtered field never matches.
    pub fn matches(&self, record: &PostRecord) -> bool {
        let status_ok = self.status.is_none_or(|s| record.status == Some(s));
        let author_ok = self
            .author_id
            .as_deref()
            .is_none_or(|a| record.author_id.as_deref() == Some(a));
        status_ok && author_ok
    }
}

/// Access to the `posts` collection.
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Posts matching the query, newest first where the store can order.
    async fn query(&self, query: &PostQuery) -> Result<Vec<Stored<PostRecord>>, RepoError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Stored<PostRecord>>, RepoError>;

    /// Store a new post. The store assigns the id and stamps the timestamp,
    /// replacing whatever `record.timestamp` carried.
    async fn insert(&self, record: PostRecord) -> Result<String, RepoError>;

    /// Write the provided fields and stamp `lastModifiedAt`.
    /// Returns `false` when no post has this id.
    async fn update(&self, id: &str, patch: PostPatch) -> Result<bool, RepoError>;

    /// Remove the post and its whole comment sub-collection in one batch.
    /// Either everything goes or nothing does.
    async fn delete_cascade(&self, id: &str) -> Result<(), RepoError>;
}

/// Access to the `comments` sub-collection of each post.
#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn list(&self, post_id: &str) -> Result<Vec<Stored<CommentRecord>>, RepoError>;

    /// Store a new comment; id and timestamp are store-assigned.
    async fn insert(&self, post_id: &str, record: CommentRecord) -> Result<String, RepoError>;

    async fn delete(&self, post_id: &str, comment_id: &str) -> Result<(), RepoError>;

    /// Push the current snapshot now and again after every insert or delete.
    /// Deleting the post pushes an empty snapshot and drops the listener.
    async fn watch(
        &self,
        post_id: &str,
        listener: CommentListener,
    ) -> Result<Subscription, RepoError>;
}

/// Access to the `users` collection.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<ProfileRecord>, RepoError>;

    /// Write the whole record, replacing any existing one, and stamp
    /// `createdAt`.
    async fn create(&self, id: &str, record: ProfileRecord) -> Result<(), RepoError>;

    /// Write the provided fields and stamp `lastUpdatedAt`.
    async fn update(&self, id: &str, patch: ProfilePatch) -> Result<(), RepoError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(author: Option<&str>, status: Option<PostStatus>) -> PostRecord {
        PostRecord {
            author_id: author.map(String::from),
            status,
            ..PostRecord::default()
        }
    }

    #[test]
    fn test_query_matches_exact_fields() {
        let q = PostQuery::by_author("a", PostStatus::Draft);
        assert!(q.matches(&record(Some("a"), Some(PostStatus::Draft))));
        assert!(!q.matches(&record(Some("b"), Some(PostStatus::Draft))));
        assert!(!q.matches(&record(Some("a"), Some(PostStatus::Published))));
        assert!(!q.matches(&record(Some("a"), None)));
        assert!(PostQuery::all().matches(&record(None, None)));
    }
}
