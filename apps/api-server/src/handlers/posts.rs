//! Post handlers.

use actix_web::{HttpResponse, web};

use inkwell_core::domain::{Post, PostStatus};
use inkwell_shared::dto::{MyContentResponse, PostForm, PostPatchRequest};
use inkwell_shared::forms;

use super::views;
use crate::middleware::auth::{CurrentUser, OptionalUser};
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("post with id {} not found", id))
}

/// A post the caller may see: published, or a draft of their own.
pub(super) async fn visible_post(state: &AppState, id: &str, viewer: Option<&str>) -> AppResult<Post> {
    let post = state.content.get_post(id).await?.ok_or_else(|| not_found(id))?;
    if post.is_published() || viewer.is_some_and(|uid| post.is_owned_by(uid)) {
        Ok(post)
    } else {
        Err(not_found(id))
    }
}

/// An existing post owned by the caller.
async fn owned_post(state: &AppState, id: &str, current: &CurrentUser) -> AppResult<Option<Post>> {
    let Some(post) = state.content.get_post(id).await? else {
        return Ok(None);
    };
    if !post.is_owned_by(&current.user.id) {
        tracing::warn!(post_id = %id, user_id = %current.user.id, "Rejected edit by non-author");
        return Err(AppError::Forbidden);
    }
    Ok(Some(post))
}

/// GET /api/posts
pub async fn list_published(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let posts = state.content.list_published_posts().await?;
    Ok(HttpResponse::Ok().json(views::posts(posts)))
}

/// POST /api/posts
pub async fn create(
    state: web::Data<AppState>,
    current: CurrentUser,
    body: web::Json<PostForm>,
) -> AppResult<HttpResponse> {
    let form = forms::validate_post(&body).map_err(AppError::Validation)?;
    let post = state
        .content
        .create_post(views::new_post(form)?, &current.user)
        .await?;
    Ok(HttpResponse::Created().json(views::post(post)))
}

/// GET /api/posts/{id}
pub async fn get(
    state: web::Data<AppState>,
    viewer: OptionalUser,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let post = visible_post(&state, &path, viewer.user_id()).await?;
    Ok(HttpResponse::Ok().json(views::post(post)))
}

/// PATCH /api/posts/{id}
pub async fn update(
    state: web::Data<AppState>,
    current: CurrentUser,
    path: web::Path<String>,
    body: web::Json<PostPatchRequest>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let patch = forms::validate_post_patch(&body).map_err(AppError::Validation)?;
    let patch = views::post_patch(patch)?;

    if owned_post(&state, &id, &current).await?.is_none() {
        return Err(not_found(&id));
    }
    let post = state
        .content
        .update_post(&id, patch)
        .await?
        .ok_or_else(|| not_found(&id))?;
    Ok(HttpResponse::Ok().json(views::post(post)))
}

/// DELETE /api/posts/{id}
///
/// Removes the post and all of its comments. Deleting a missing post
/// succeeds.
pub async fn delete(
    state: web::Data<AppState>,
    current: CurrentUser,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    if owned_post(&state, &id, &current).await?.is_some() {
        state.content.delete_post(&id).await?;
    }
    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/me/content
pub async fn my_content(state: web::Data<AppState>, current: CurrentUser) -> AppResult<HttpResponse> {
    let uid = &current.user.id;
    let drafts = state
        .content
        .list_posts_by_author_and_status(uid, PostStatus::Draft)
        .await?;
    let published = state
        .content
        .list_posts_by_author_and_status(uid, PostStatus::Published)
        .await?;

    Ok(HttpResponse::Ok().json(MyContentResponse {
        drafts: views::posts(drafts),
        published: views::posts(published),
    }))
}
