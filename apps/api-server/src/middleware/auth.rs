//! Session extractors.
//!
//! Every authenticated request gets its own [`SessionContext`], restored
//! from the bearer token and dropped with the request.

use actix_web::{FromRequest, HttpRequest, dev::Payload, http::header, web};
use futures::future::LocalBoxFuture;

use inkwell_core::SessionContext;
use inkwell_core::domain::UserProfile;
use inkwell_core::ports::AuthError;

use crate::middleware::error::AppError;
use crate::state::AppState;

/// The signed-in caller. Rejects the request with 401 otherwise.
pub struct CurrentUser {
    pub user: UserProfile,
    pub session: SessionContext,
}

fn bearer_token(req: &HttpRequest) -> Result<String, AuthError> {
    let value = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingAuth)?;
    let value = value
        .to_str()
        .map_err(|_| AuthError::InvalidToken("Invalid authorization header".to_string()))?;
    value
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AuthError::InvalidToken("Expected Bearer token".to_string()))
}

impl FromRequest for CurrentUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let token = bearer_token(req);

        Box::pin(async move {
            let state = state.ok_or_else(|| {
                AppError::Internal("AppState not found in app data".to_string())
            })?;
            let token = token?;

            let mut session = state.session();
            let user = session.restore(&token).await?;
            Ok(CurrentUser { user, session })
        })
    }
}

/// The caller if signed in. Bad or missing tokens read as anonymous.
pub struct OptionalUser(pub Option<CurrentUser>);

impl FromRequest for OptionalUser {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let current = CurrentUser::from_request(req, payload);
        Box::pin(async move { Ok(OptionalUser(current.await.ok())) })
    }
}

impl OptionalUser {
    pub fn user_id(&self) -> Option<&str> {
        self.0.as_ref().map(|current| current.user.id.as_str())
    }
}
