//! Authentication handlers.

use actix_web::{HttpResponse, web};

use inkwell_core::ports::AuthSession;
use inkwell_core::SessionContext;
use inkwell_shared::dto::{AuthResponse, LoginRequest, SignupRequest};
use inkwell_shared::forms;

use super::views;
use crate::middleware::auth::CurrentUser;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

fn auth_response(session: &SessionContext, auth: AuthSession) -> AppResult<AuthResponse> {
    let user = session
        .current_user()
        .cloned()
        .ok_or_else(|| AppError::Internal("session not authenticated after sign-in".to_string()))?;
    Ok(AuthResponse {
        access_token: auth.token,
        token_type: "Bearer".to_string(),
        expires_in: auth.expires_in,
        user: views::user(user),
    })
}

/// POST /api/auth/signup
pub async fn signup(
    state: web::Data<AppState>,
    body: web::Json<SignupRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    forms::validate_signup(&req).map_err(AppError::Validation)?;

    let mut session = state.session();
    let auth = session
        .signup(req.name.trim(), req.email.trim(), &req.password)
        .await?;

    Ok(HttpResponse::Created().json(auth_response(&session, auth)?))
}

/// POST /api/auth/login
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    forms::validate_login(&req).map_err(AppError::Validation)?;

    let mut session = state.session();
    let auth = session.login(req.email.trim(), &req.password).await?;

    Ok(HttpResponse::Ok().json(auth_response(&session, auth)?))
}

/// POST /api/auth/logout
pub async fn logout(current: CurrentUser) -> AppResult<HttpResponse> {
    let CurrentUser { mut session, .. } = current;
    session.logout().await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/auth/me
pub async fn me(current: CurrentUser) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(views::user(current.user)))
}
