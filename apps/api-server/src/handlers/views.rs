//! Conversions between domain entities and wire types.

use chrono::{DateTime, SecondsFormat, Utc};
use std::str::FromStr;

use inkwell_core::domain::{
    AuthorSnapshot, Comment, NewPost, Post, PostPatch, PostStatus, ProfileChanges, UserProfile,
};
use inkwell_shared::dto::{
    AuthorResponse, CommentResponse, PostResponse, ProfileUpdateRequest, UserResponse,
};
use inkwell_shared::forms::{ValidPost, ValidPostPatch};

use crate::middleware::error::AppError;

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn status(raw: &str) -> Result<PostStatus, AppError> {
    PostStatus::from_str(raw).map_err(|e| AppError::Validation(vec![e]))
}

pub fn author(author: AuthorSnapshot) -> AuthorResponse {
    AuthorResponse {
        id: author.id,
        name: author.name,
        avatar_url: author.avatar_url,
    }
}

pub fn post(post: Post) -> PostResponse {
    PostResponse {
        id: post.id,
        title: post.title,
        excerpt: post.excerpt,
        content: post.content,
        categories: post.categories,
        tags: post.tags,
        image_url: post.image_url,
        timestamp: rfc3339(post.timestamp),
        status: post.status.as_str().to_string(),
        author: author(post.author),
        author_id: post.author_id,
        comment_count: post.comment_count,
        last_modified_at: post.last_modified_at.map(rfc3339),
    }
}

pub fn posts(posts: Vec<Post>) -> Vec<PostResponse> {
    posts.into_iter().map(post).collect()
}

pub fn comment(comment: Comment) -> CommentResponse {
    CommentResponse {
        id: comment.id,
        post_id: comment.post_id,
        content: comment.content,
        timestamp: rfc3339(comment.timestamp),
        user: author(comment.user),
    }
}

pub fn user(user: UserProfile) -> UserResponse {
    UserResponse {
        id: user.id,
        name: user.name,
        email: user.email,
        avatar_url: user.avatar_url,
        bio: user.bio,
    }
}

pub fn new_post(form: ValidPost) -> Result<NewPost, AppError> {
    Ok(NewPost {
        status: status(&form.status)?,
        title: form.title,
        excerpt: form.excerpt,
        content: form.content,
        categories: form.categories,
        tags: form.tags,
        image_url: form.image_url,
    })
}

/// A cleared image is written as an empty string, which reads back as none.
pub fn post_patch(form: ValidPostPatch) -> Result<PostPatch, AppError> {
    Ok(PostPatch {
        status: form.status.as_deref().map(status).transpose()?,
        title: form.title,
        excerpt: form.excerpt,
        content: form.content,
        categories: form.categories,
        tags: form.tags,
        image_url: form.image_url.map(Option::unwrap_or_default),
    })
}

pub fn profile_changes(request: ProfileUpdateRequest) -> ProfileChanges {
    ProfileChanges {
        name: request.name.map(|n| n.trim().to_string()),
        bio: request.bio,
        avatar_url: request.avatar_url.map(|a| a.trim().to_string()),
    }
}
