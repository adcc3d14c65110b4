//! Comment handlers, including the live comment stream.

use actix_web::{HttpResponse, web};
use actix_web::web::Bytes;
use futures::stream;
use tokio::sync::mpsc;

use inkwell_shared::dto::{CommentRequest, CommentResponse};
use inkwell_shared::forms;

use super::posts::visible_post;
use super::views;
use crate::middleware::auth::{CurrentUser, OptionalUser};
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// GET /api/posts/{id}/comments
pub async fn list(
    state: web::Data<AppState>,
    viewer: OptionalUser,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let post = visible_post(&state, &path, viewer.user_id()).await?;
    let comments = state.content.list_comments(&post.id).await?;
    let body: Vec<CommentResponse> = comments.into_iter().map(views::comment).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// POST /api/posts/{id}/comments
pub async fn add(
    state: web::Data<AppState>,
    current: CurrentUser,
    path: web::Path<String>,
    body: web::Json<CommentRequest>,
) -> AppResult<HttpResponse> {
    let content = forms::validate_comment(&body.content).map_err(AppError::Validation)?;
    let comment = state
        .content
        .add_comment(&path, &content, &current.user)
        .await?;
    Ok(HttpResponse::Created().json(views::comment(comment)))
}

/// DELETE /api/posts/{id}/comments/{comment_id}
///
/// Only the comment's author may delete it. Deleting a missing comment
/// succeeds.
pub async fn delete(
    state: web::Data<AppState>,
    current: CurrentUser,
    path: web::Path<(String, String)>,
) -> AppResult<HttpResponse> {
    let (post_id, comment_id) = path.into_inner();
    let Some(comment) = state.content.find_comment(&post_id, &comment_id).await? else {
        return Ok(HttpResponse::NoContent().finish());
    };
    if !comment.is_authored_by(&current.user.id) {
        return Err(AppError::Forbidden);
    }

    state.content.delete_comment(&post_id, &comment_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

fn event(comments: &[CommentResponse]) -> Option<Bytes> {
    match serde_json::to_string(comments) {
        Ok(json) => Some(Bytes::from(format!("event: comments\ndata: {json}\n\n"))),
        Err(e) => {
            tracing::error!(error = %e, "Could not encode comment snapshot");
            None
        }
    }
}

/// GET /api/posts/{id}/comments/stream
///
/// Server-sent events: one `comments` event with the full list, newest
/// first, on connect and after every change. The subscription lives as
/// long as the response stream, which ends after the post is deleted.
pub async fn stream(
    state: web::Data<AppState>,
    viewer: OptionalUser,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let post = visible_post(&state, &path, viewer.user_id()).await?;

    let (tx, rx) = mpsc::unbounded_channel::<Bytes>();
    let subscription = state
        .content
        .subscribe_comments(&post.id, move |comments| {
            let body: Vec<CommentResponse> = comments.into_iter().map(views::comment).collect();
            if let Some(bytes) = event(&body) {
                // A closed receiver means the client is gone; the drop of
                // the stream releases the subscription.
                let _ = tx.send(bytes);
            }
        })
        .await?;
    tracing::debug!(post_id = %post.id, "Comment stream opened");

    let events = stream::unfold((rx, subscription), |(mut rx, subscription)| async move {
        let bytes = rx.recv().await?;
        Some((Ok::<_, actix_web::Error>(bytes), (rx, subscription)))
    });

    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(events))
}
