//! Session context - the signed-in user, scoped to one client session.
//!
//! A session starts `Unknown`, passes through `Authenticating` whenever the
//! identity provider reports an identity, and settles on `Authenticated`
//! with a merged [`UserProfile`] or on `Anonymous`. The context is created
//! per client session and handed to whatever needs the current user.
//!
//! The profile store never blocks sign-in: if the profile record is missing
//! one is synthesized and written back, and if the store is unreachable the
//! session carries on with what the identity provider knows.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream::BoxStream;

use crate::domain::{DEFAULT_AVATAR_URL, ProfileChanges, UserProfile};
use crate::error::DomainError;
use crate::ports::{AuthIdentity, AuthSession, DisplayProfileUpdate, IdentityProvider, ProfileRepository};
use crate::records::{ProfilePatch, ProfileRecord};

/// Bio written for accounts created through signup.
pub const SIGNUP_BIO: &str = "Newly registered user.";

const FALLBACK_NAME: &str = "User";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unknown,
    Authenticating,
    Authenticated(UserProfile),
    Anonymous,
}

pub struct SessionContext {
    identity: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileRepository>,
    state: SessionState,
    auth: Option<AuthIdentity>,
    token: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn display_name(identity: &AuthIdentity) -> String {
    non_empty(identity.display_name.clone())
        .or_else(|| identity.email_name().map(String::from))
        .unwrap_or_else(|| FALLBACK_NAME.to_string())
}

/// Profile built from auth fields alone.
fn auth_only_profile(identity: &AuthIdentity) -> UserProfile {
    UserProfile {
        id: identity.uid.clone(),
        name: display_name(identity),
        email: identity.email.clone(),
        avatar_url: non_empty(identity.photo_url.clone()),
        bio: Some(String::new()),
    }
}

impl SessionContext {
    pub fn new(identity: Arc<dyn IdentityProvider>, profiles: Arc<dyn ProfileRepository>) -> Self {
        Self {
            identity,
            profiles,
            state: SessionState::Unknown,
            auth: None,
            token: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn current_user(&self) -> Option<&UserProfile> {
        match &self.state {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, SessionState::Unknown | SessionState::Authenticating)
    }

    /// Re-establish a session from a bearer token.
    pub async fn restore(&mut self, token: &str) -> Result<UserProfile, DomainError> {
        self.state = SessionState::Authenticating;
        match self.identity.resolve(token).await {
            Ok(identity) => {
                self.token = Some(token.to_string());
                self.apply_identity(Some(identity)).await;
                self.current_user().cloned().ok_or(DomainError::Unauthorized)
            }
            Err(err) => {
                tracing::debug!(error = %err, "Session token rejected");
                self.apply_identity(None).await;
                Err(err.into())
            }
        }
    }

    /// Auth-state callback. `None` means signed out.
    pub async fn apply_identity(&mut self, identity: Option<AuthIdentity>) {
        let Some(identity) = identity else {
            self.teardown();
            return;
        };

        if matches!(self.state, SessionState::Authenticated(_)) && self.auth.as_ref() == Some(&identity) {
            tracing::trace!(user_id = %identity.uid, "Identity unchanged");
            return;
        }

        self.state = SessionState::Authenticating;
        let user = self.load_profile(&identity).await;
        tracing::info!(user_id = %user.id, "Session authenticated");
        self.auth = Some(identity);
        self.state = SessionState::Authenticated(user);
    }

    /// Drive the state machine from a provider stream until it ends.
    pub async fn follow(&mut self, mut changes: BoxStream<'_, Option<AuthIdentity>>) {
        while let Some(identity) = changes.next().await {
            self.apply_identity(identity).await;
        }
    }

    fn teardown(&mut self) {
        if let Some(auth) = self.auth.take() {
            tracing::info!(user_id = %auth.uid, "Session ended");
        }
        self.token = None;
        self.state = SessionState::Anonymous;
    }

    async fn load_profile(&self, identity: &AuthIdentity) -> UserProfile {
        match self.profiles.find_by_id(&identity.uid).await {
            Ok(Some(record)) => UserProfile {
                id: identity.uid.clone(),
                name: non_empty(record.name).unwrap_or_else(|| display_name(identity)),
                email: identity.email.clone(),
                avatar_url: non_empty(record.avatar_url)
                    .or_else(|| non_empty(identity.photo_url.clone())),
                bio: Some(record.bio.unwrap_or_default()),
            },
            Ok(None) => {
                let profile = UserProfile {
                    avatar_url: Some(
                        non_empty(identity.photo_url.clone())
                            .unwrap_or_else(|| DEFAULT_AVATAR_URL.to_string()),
                    ),
                    ..auth_only_profile(identity)
                };
                match self
                    .profiles
                    .create(&identity.uid, ProfileRecord::from(&profile))
                    .await
                {
                    Ok(()) => {
                        tracing::info!(user_id = %identity.uid, "Created missing profile record");
                        profile
                    }
                    Err(err) => {
                        tracing::error!(
                            user_id = %identity.uid,
                            error = %err,
                            "Could not create missing profile record"
                        );
                        auth_only_profile(identity)
                    }
                }
            }
            Err(err) => {
                tracing::error!(user_id = %identity.uid, error = %err, "Profile lookup failed");
                auth_only_profile(identity)
            }
        }
    }

    /// Sign in with email and password.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<AuthSession, DomainError> {
        let previous = std::mem::replace(&mut self.state, SessionState::Authenticating);
        let session = match self.identity.sign_in(email, password).await {
            Ok(session) => session,
            Err(err) => {
                tracing::warn!(error = %err, "Login failed");
                self.state = previous;
                return Err(err.into());
            }
        };

        self.token = Some(session.token.clone());
        self.apply_identity(Some(session.identity.clone())).await;
        Ok(session)
    }

    /// Create an account, its display profile and its profile record, then
    /// sign in as it.
    pub async fn signup(
        &mut self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, DomainError> {
        let previous = std::mem::replace(&mut self.state, SessionState::Authenticating);
        let result = self.register(name, email, password).await;
        match result {
            Ok(session) => {
                self.token = Some(session.token.clone());
                self.apply_identity(Some(session.identity.clone())).await;
                Ok(session)
            }
            Err(err) => {
                tracing::warn!(error = %err, "Signup failed");
                self.state = previous;
                Err(err)
            }
        }
    }

    async fn register(&self, name: &str, email: &str, password: &str) -> Result<AuthSession, DomainError> {
        let mut session = self.identity.create_account(email, password).await?;
        let uid = session.identity.uid.clone();

        session.identity = self
            .identity
            .update_display_profile(
                &uid,
                DisplayProfileUpdate {
                    display_name: Some(name.to_string()),
                    photo_url: Some(DEFAULT_AVATAR_URL.to_string()),
                },
            )
            .await?;

        let record = ProfileRecord {
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            avatar_url: Some(DEFAULT_AVATAR_URL.to_string()),
            bio: Some(SIGNUP_BIO.to_string()),
            ..ProfileRecord::default()
        };
        if let Err(err) = self.profiles.create(&uid, record).await {
            // The auth-state path recreates it on next sign-in.
            tracing::error!(user_id = %uid, error = %err, "Profile record write failed during signup");
        }

        tracing::info!(user_id = %uid, "Account registered");
        Ok(session)
    }

    /// End the session with the provider, then tear it down locally.
    pub async fn logout(&mut self) -> Result<(), DomainError> {
        if let Some(token) = self.token.clone() {
            if let Err(err) = self.identity.sign_out(&token).await {
                tracing::error!(error = %err, "Logout failed");
                return Err(err.into());
            }
        }
        self.apply_identity(None).await;
        Ok(())
    }

    /// Apply the changed subset of name, bio and avatar to both the
    /// provider's display profile and the profile record.
    pub async fn update_profile(&mut self, changes: ProfileChanges) -> Result<UserProfile, DomainError> {
        let SessionState::Authenticated(current) = &self.state else {
            return Err(DomainError::Unauthorized);
        };
        let mut user = current.clone();

        let mut display = DisplayProfileUpdate::default();
        let mut patch = ProfilePatch::default();

        if let Some(name) = changes.name.filter(|n| !n.is_empty() && *n != user.name) {
            display.display_name = Some(name.clone());
            patch.name = Some(name);
        }
        if let Some(bio) = changes.bio.filter(|b| user.bio.as_deref() != Some(b.as_str())) {
            patch.bio = Some(bio);
        }
        match changes.avatar_url {
            Some(url) if !url.is_empty() && user.avatar_url.as_deref() != Some(url.as_str()) => {
                display.photo_url = Some(url.clone());
                patch.avatar_url = Some(url);
            }
            Some(url) if url.is_empty() && user.avatar_url.is_some() => {
                display.photo_url = Some(DEFAULT_AVATAR_URL.to_string());
                patch.avatar_url = Some(DEFAULT_AVATAR_URL.to_string());
            }
            _ => {}
        }

        if display.is_empty() && patch.is_empty() {
            return Ok(user);
        }

        if !display.is_empty() {
            let updated = self.identity.update_display_profile(&user.id, display).await?;
            self.auth = Some(updated);
        }
        if !patch.is_empty() {
            self.profiles
                .update(&user.id, patch.clone())
                .await
                .map_err(|err| {
                    tracing::error!(user_id = %user.id, error = %err, "Profile update failed");
                    DomainError::from(err)
                })?;
        }

        if let Some(name) = patch.name {
            user.name = name;
        }
        if let Some(bio) = patch.bio {
            user.bio = Some(bio);
        }
        if let Some(avatar_url) = patch.avatar_url {
            user.avatar_url = Some(avatar_url);
        }

        tracing::info!(user_id = %user.id, "Profile updated");
        self.state = SessionState::Authenticated(user.clone());
        Ok(user)
    }
}
