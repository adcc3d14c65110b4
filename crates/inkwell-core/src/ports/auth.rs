//! Identity provider port.

use async_trait::async_trait;
use futures::stream::BoxStream;

/// The identity as the provider knows it, independent of the profile record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthIdentity {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

impl AuthIdentity {
    /// Part of the email before the `@`, used as a fallback display name.
    pub fn email_name(&self) -> Option<&str> {
        self.email
            .as_deref()
            .and_then(|email| email.split('@').next())
            .filter(|local| !local.is_empty())
    }
}

/// A signed-in identity plus the bearer token that proves it.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub identity: AuthIdentity,
    pub token: String,
    pub expires_in: u64,
}

/// Display fields kept by the provider itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayProfileUpdate {
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

impl DisplayProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.photo_url.is_none()
    }
}

/// Hosted identity service: accounts, sessions and basic display fields.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn create_account(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;

    /// End the session the token belongs to.
    async fn sign_out(&self, token: &str) -> Result<(), AuthError>;

    /// Identity behind a live session token.
    async fn resolve(&self, token: &str) -> Result<AuthIdentity, AuthError>;

    async fn update_display_profile(
        &self,
        uid: &str,
        update: DisplayProfileUpdate,
    ) -> Result<AuthIdentity, AuthError>;

    /// Pushes the identity whenever it changes and `None` on sign-out.
    /// Dropping the stream ends the subscription.
    fn identity_changes(&self, uid: &str) -> BoxStream<'static, Option<AuthIdentity>>;
}

/// Authentication errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email already in use")]
    EmailInUse,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Missing authorization header")]
    MissingAuth,

    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    #[error("Identity provider error: {0}")]
    Provider(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_name() {
        let mut identity = AuthIdentity {
            uid: "u".into(),
            email: Some("ada@example.com".into()),
            display_name: None,
            photo_url: None,
        };
        assert_eq!(identity.email_name(), Some("ada"));

        identity.email = Some("@example.com".into());
        assert_eq!(identity.email_name(), None);

        identity.email = None;
        assert_eq!(identity.email_name(), None);
    }
}
