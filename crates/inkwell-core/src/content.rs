//! Content access layer - posts and comments over the store ports.
//!
//! Every record leaving this module has been through the normalizer and
//! lists come back newest first. Store failures are logged here and handed
//! to the caller as [`DomainError::BackendUnavailable`]; nothing is retried.
//! Ownership checks belong to the caller.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::{AuthorSnapshot, Comment, NewPost, Post, PostPatch, PostStatus, RawTimestamp, UserProfile};
use crate::error::{DomainError, RepoError};
use crate::normalize::{normalize_comment, normalize_post, sort_comments, sort_posts};
use crate::ports::{CommentListener, CommentRepository, PostQuery, PostRepository, Subscription};
use crate::records::{CommentRecord, PostRecord};

fn backend(err: RepoError, operation: &'static str, id: &str) -> DomainError {
    tracing::error!(error = %err, id = %id, "{operation} failed");
    DomainError::from(err)
}

/// Post and comment operations used by every view.
#[derive(Clone)]
pub struct ContentService {
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
}

impl ContentService {
    pub fn new(posts: Arc<dyn PostRepository>, comments: Arc<dyn CommentRepository>) -> Self {
        Self { posts, comments }
    }

    async fn fetch(&self, query: &PostQuery) -> Result<Vec<Post>, DomainError> {
        let stored = self.posts.query(query).await.map_err(|err| {
            tracing::error!(error = %err, query = ?query, "Post query failed");
            DomainError::from(err)
        })?;

        let mut posts: Vec<Post> = stored
            .into_iter()
            .map(|s| normalize_post(&s.id, s.record))
            .collect();
        sort_posts(&mut posts);
        Ok(posts)
    }

    /// Every post, drafts included.
    pub async fn list_all_posts(&self) -> Result<Vec<Post>, DomainError> {
        self.fetch(&PostQuery::all()).await
    }

    pub async fn list_published_posts(&self) -> Result<Vec<Post>, DomainError> {
        self.fetch(&PostQuery::with_status(PostStatus::Published))
            .await
    }

    /// One author's posts in one status, e.g. the drafts tab of "my content".
    pub async fn list_posts_by_author_and_status(
        &self,
        author_id: &str,
        status: PostStatus,
    ) -> Result<Vec<Post>, DomainError> {
        let mut posts = self.fetch(&PostQuery::by_author(author_id, status)).await?;
        posts.retain(|p| p.author_id == author_id && p.status == status);
        Ok(posts)
    }

    /// `Ok(None)` when no post has this id.
    pub async fn get_post(&self, id: &str) -> Result<Option<Post>, DomainError> {
        let stored = self
            .posts
            .find_by_id(id)
            .await
            .map_err(|err| backend(err, "Post lookup", id))?;

        match stored {
            Some(s) => Ok(Some(normalize_post(&s.id, s.record))),
            None => {
                tracing::debug!(post_id = %id, "Post not found");
                Ok(None)
            }
        }
    }

    /// Store a new post written by `author`. Id and timestamp come from the
    /// store; the author snapshot is frozen at this moment.
    pub async fn create_post(&self, post: NewPost, author: &UserProfile) -> Result<Post, DomainError> {
        let status = post.status;
        let record = PostRecord {
            title: Some(post.title),
            excerpt: Some(post.excerpt),
            content: Some(post.content),
            categories: Some(post.categories),
            tags: Some(post.tags),
            image_url: post.image_url,
            timestamp: None,
            status: Some(status),
            author: Some(AuthorSnapshot::from(author).into()),
            author_id: Some(author.id.clone()),
            comment_count: Some(0),
            last_modified_at: None,
        };

        let id = self
            .posts
            .insert(record.clone())
            .await
            .map_err(|err| backend(err, "Post insert", &author.id))?;
        tracing::info!(post_id = %id, author_id = %author.id, status = %status, "Post created");

        match self.get_post(&id).await? {
            Some(created) => Ok(created),
            None => {
                tracing::warn!(post_id = %id, "Created post not readable yet, returning local copy");
                let record = PostRecord {
                    timestamp: Some(RawTimestamp::Native(Utc::now())),
                    ..record
                };
                Ok(normalize_post(&id, record))
            }
        }
    }

    /// Apply the provided fields only. `Ok(None)` when the post is gone.
    pub async fn update_post(&self, id: &str, patch: PostPatch) -> Result<Option<Post>, DomainError> {
        let found = self
            .posts
            .update(id, patch)
            .await
            .map_err(|err| backend(err, "Post update", id))?;

        if !found {
            tracing::debug!(post_id = %id, "Update skipped, post not found");
            return Ok(None);
        }

        tracing::info!(post_id = %id, "Post updated");
        self.get_post(id).await
    }

    /// Delete the post together with all of its comments, atomically.
    pub async fn delete_post(&self, id: &str) -> Result<(), DomainError> {
        self.posts
            .delete_cascade(id)
            .await
            .map_err(|err| backend(err, "Post delete", id))?;

        tracing::info!(post_id = %id, "Post and its comments deleted");
        Ok(())
    }

    /// Comments on a post, newest first.
    pub async fn list_comments(&self, post_id: &str) -> Result<Vec<Comment>, DomainError> {
        let stored = self
            .comments
            .list(post_id)
            .await
            .map_err(|err| backend(err, "Comment listing", post_id))?;

        let mut comments: Vec<Comment> = stored
            .into_iter()
            .map(|s| normalize_comment(post_id, &s.id, s.record))
            .collect();
        sort_comments(&mut comments);
        Ok(comments)
    }

    pub async fn find_comment(
        &self,
        post_id: &str,
        comment_id: &str,
    ) -> Result<Option<Comment>, DomainError> {
        let comments = self.list_comments(post_id).await?;
        Ok(comments.into_iter().find(|c| c.id == comment_id))
    }

    /// Comment on a published post as `author`.
    pub async fn add_comment(
        &self,
        post_id: &str,
        body: &str,
        author: &UserProfile,
    ) -> Result<Comment, DomainError> {
        let body = body.trim();
        if body.is_empty() {
            return Err(DomainError::invalid("Comment cannot be empty."));
        }

        let post = self
            .get_post(post_id)
            .await?
            .ok_or_else(|| DomainError::not_found("post", post_id))?;
        if !post.is_published() {
            return Err(DomainError::invalid(
                "Comments are only allowed on published posts.",
            ));
        }

        let record = CommentRecord {
            user_id: Some(author.id.clone()),
            user: Some(AuthorSnapshot::from(author).into()),
            content: Some(body.to_string()),
            timestamp: None,
        };
        let id = self
            .comments
            .insert(post_id, record.clone())
            .await
            .map_err(|err| backend(err, "Comment insert", post_id))?;
        tracing::info!(post_id = %post_id, comment_id = %id, "Comment posted");

        match self.find_comment(post_id, &id).await? {
            Some(comment) => Ok(comment),
            None => {
                let record = CommentRecord {
                    timestamp: Some(RawTimestamp::Native(Utc::now())),
                    ..record
                };
                Ok(normalize_comment(post_id, &id, record))
            }
        }
    }

    pub async fn delete_comment(&self, post_id: &str, comment_id: &str) -> Result<(), DomainError> {
        self.comments
            .delete(post_id, comment_id)
            .await
            .map_err(|err| backend(err, "Comment delete", comment_id))?;

        tracing::info!(post_id = %post_id, comment_id = %comment_id, "Comment deleted");
        Ok(())
    }

    /// Live comment list for one post. `on_change` receives the whole list,
    /// newest first, once immediately and again after every change. The
    /// caller owns the returned handle and releases it when done; deleting
    /// the post delivers an empty list and releases `on_change`.
    pub async fn subscribe_comments<F>(
        &self,
        post_id: &str,
        on_change: F,
    ) -> Result<Subscription, DomainError>
    where
        F: Fn(Vec<Comment>) + Send + Sync + 'static,
    {
        let pid = post_id.to_string();
        let listener: CommentListener = Arc::new(move |snapshot| {
            let mut comments: Vec<Comment> = snapshot
                .into_iter()
                .map(|s| normalize_comment(&pid, &s.id, s.record))
                .collect();
            sort_comments(&mut comments);
            on_change(comments);
        });

        self.comments
            .watch(post_id, listener)
            .await
            .map_err(|err| backend(err, "Comment subscription", post_id))
    }
}
