//! Profile handlers.

use actix_web::{HttpResponse, web};

use inkwell_shared::dto::ProfileUpdateRequest;
use inkwell_shared::forms;

use super::views;
use crate::middleware::auth::CurrentUser;
use crate::middleware::error::{AppError, AppResult};

/// GET /api/profile
pub async fn get(current: CurrentUser) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(views::user(current.user)))
}

/// PATCH /api/profile
pub async fn update(
    current: CurrentUser,
    body: web::Json<ProfileUpdateRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    forms::validate_profile(&req).map_err(AppError::Validation)?;

    let CurrentUser { mut session, .. } = current;
    let user = session.update_profile(views::profile_changes(req)).await?;
    Ok(HttpResponse::Ok().json(views::user(user)))
}
