//! Identity provider backed by process memory.
//!
//! Accounts are keyed by uid with a case-insensitive email index. Sessions
//! are stateless JWTs; signing out records the token's session id so it no
//! longer resolves. A revocation is kept only until the token would have
//! expired anyway.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use futures::StreamExt;
use futures::channel::mpsc;
use futures::stream::BoxStream;
use tokio::sync::RwLock;
use uuid::Uuid;

use inkwell_core::ports::{AuthError, AuthIdentity, AuthSession, DisplayProfileUpdate, IdentityProvider};

use super::{Argon2Passwords, JwtConfig, SessionTokens};

type IdentitySender = mpsc::UnboundedSender<Option<AuthIdentity>>;

struct Account {
    identity: AuthIdentity,
    password_hash: String,
}

#[derive(Default)]
struct Directory {
    accounts: HashMap<String, Account>,
    by_email: HashMap<String, String>,
}

pub struct LocalIdentityProvider {
    directory: RwLock<Directory>,
    /// Signed-out session ids with their token expiry (unix seconds).
    revoked: RwLock<HashMap<String, i64>>,
    watchers: Mutex<HashMap<String, Vec<IdentitySender>>>,
    tokens: SessionTokens,
    passwords: Argon2Passwords,
}

impl LocalIdentityProvider {
    pub fn new(config: JwtConfig) -> Self {
        Self {
            directory: RwLock::new(Directory::default()),
            revoked: RwLock::new(HashMap::new()),
            watchers: Mutex::new(HashMap::new()),
            tokens: SessionTokens::new(config),
            passwords: Argon2Passwords::new(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(JwtConfig::from_env())
    }

    fn open_session(&self, identity: AuthIdentity) -> Result<AuthSession, AuthError> {
        let (token, _) = self.tokens.issue(&identity.uid, identity.email.as_deref())?;
        Ok(AuthSession {
            identity,
            token,
            expires_in: self.tokens.expires_in(),
        })
    }

    /// Push to every live watcher of `uid`, dropping closed ones.
    fn notify(&self, uid: &str, change: Option<AuthIdentity>) {
        let mut watchers = self.watchers.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(senders) = watchers.get_mut(uid) else {
            return;
        };
        senders.retain(|tx| tx.unbounded_send(change.clone()).is_ok());
        if change.is_none() || senders.is_empty() {
            // Sign-out ends every stream for the uid.
            watchers.remove(uid);
        }
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn create_account(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let key = normalize_email(email);
        let password_hash = self.passwords.hash(password)?;

        let identity = {
            let mut directory = self.directory.write().await;
            if directory.by_email.contains_key(&key) {
                return Err(AuthError::EmailInUse);
            }

            let identity = AuthIdentity {
                uid: Uuid::new_v4().simple().to_string(),
                email: Some(email.trim().to_string()),
                display_name: None,
                photo_url: None,
            };
            directory.by_email.insert(key, identity.uid.clone());
            directory.accounts.insert(
                identity.uid.clone(),
                Account {
                    identity: identity.clone(),
                    password_hash,
                },
            );
            identity
        };

        tracing::info!(user_id = %identity.uid, "Account created");
        self.open_session(identity)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let identity = {
            let directory = self.directory.read().await;
            let account = directory
                .by_email
                .get(&normalize_email(email))
                .and_then(|uid| directory.accounts.get(uid))
                .ok_or(AuthError::InvalidCredentials)?;

            if !self.passwords.verify(password, &account.password_hash)? {
                return Err(AuthError::InvalidCredentials);
            }
            account.identity.clone()
        };

        tracing::debug!(user_id = %identity.uid, "Signed in");
        self.open_session(identity)
    }

    async fn sign_out(&self, token: &str) -> Result<(), AuthError> {
        let claims = match self.tokens.verify(token) {
            Ok(claims) => claims,
            Err(AuthError::TokenExpired) => return Ok(()),
            Err(err) => return Err(err),
        };

        {
            let now = Utc::now().timestamp();
            let mut revoked = self.revoked.write().await;
            revoked.retain(|_, exp| *exp > now);
            revoked.insert(claims.jti, claims.exp);
        }
        tracing::info!(user_id = %claims.uid, "Signed out");
        self.notify(&claims.uid, None);
        Ok(())
    }

    async fn resolve(&self, token: &str) -> Result<AuthIdentity, AuthError> {
        let claims = self.tokens.verify(token)?;
        if self.revoked.read().await.contains_key(&claims.jti) {
            return Err(AuthError::InvalidToken("session has been signed out".into()));
        }

        let directory = self.directory.read().await;
        directory
            .accounts
            .get(&claims.uid)
            .map(|account| account.identity.clone())
            .ok_or(AuthError::UnknownAccount(claims.uid))
    }

    async fn update_display_profile(
        &self,
        uid: &str,
        update: DisplayProfileUpdate,
    ) -> Result<AuthIdentity, AuthError> {
        let identity = {
            let mut directory = self.directory.write().await;
            let account = directory
                .accounts
                .get_mut(uid)
                .ok_or_else(|| AuthError::UnknownAccount(uid.to_string()))?;
            if let Some(name) = update.display_name {
                account.identity.display_name = Some(name);
            }
            if let Some(photo_url) = update.photo_url {
                account.identity.photo_url = Some(photo_url);
            }
            account.identity.clone()
        };

        self.notify(uid, Some(identity.clone()));
        Ok(identity)
    }

    fn identity_changes(&self, uid: &str) -> BoxStream<'static, Option<AuthIdentity>> {
        let (tx, rx) = mpsc::unbounded();
        let mut watchers = self.watchers.lock().unwrap_or_else(PoisonError::into_inner);
        watchers.retain(|_, senders| {
            senders.retain(|tx| !tx.is_closed());
            !senders.is_empty()
        });
        watchers.entry(uid.to_string()).or_default().push(tx);
        rx.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> LocalIdentityProvider {
        LocalIdentityProvider::new(JwtConfig {
            secret: "test-secret".into(),
            expiration_hours: 1,
            issuer: "inkwell".into(),
        })
    }

    #[tokio::test]
    async fn test_create_then_sign_in() {
        let idp = provider();
        let created = idp.create_account("Ada@Example.com", "secret1").await.unwrap();
        assert_eq!(created.expires_in, 3600);

        let session = idp.sign_in("ada@example.com", "secret1").await.unwrap();
        assert_eq!(session.identity.uid, created.identity.uid);
        assert_eq!(idp.resolve(&session.token).await.unwrap().uid, created.identity.uid);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let idp = provider();
        idp.create_account("ada@example.com", "secret1").await.unwrap();
        let err = idp.create_account(" ADA@example.com", "other12").await.unwrap_err();
        assert_eq!(err, AuthError::EmailInUse);
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email_look_alike() {
        let idp = provider();
        idp.create_account("ada@example.com", "secret1").await.unwrap();
        assert_eq!(
            idp.sign_in("ada@example.com", "nope123").await.unwrap_err(),
            AuthError::InvalidCredentials
        );
        assert_eq!(
            idp.sign_in("bob@example.com", "secret1").await.unwrap_err(),
            AuthError::InvalidCredentials
        );
    }

    #[tokio::test]
    async fn test_sign_out_revokes_only_that_session() {
        let idp = provider();
        let first = idp.create_account("ada@example.com", "secret1").await.unwrap();
        let second = idp.sign_in("ada@example.com", "secret1").await.unwrap();

        idp.sign_out(&first.token).await.unwrap();

        assert!(matches!(idp.resolve(&first.token).await, Err(AuthError::InvalidToken(_))));
        assert!(idp.resolve(&second.token).await.is_ok());
    }

    #[tokio::test]
    async fn test_identity_changes_stream() {
        let idp = provider();
        let session = idp.create_account("ada@example.com", "secret1").await.unwrap();
        let uid = session.identity.uid.clone();
        let mut changes = idp.identity_changes(&uid);

        idp.update_display_profile(
            &uid,
            DisplayProfileUpdate {
                display_name: Some("Ada".into()),
                photo_url: None,
            },
        )
        .await
        .unwrap();
        idp.sign_out(&session.token).await.unwrap();

        let updated = changes.next().await.unwrap().unwrap();
        assert_eq!(updated.display_name.as_deref(), Some("Ada"));
        assert_eq!(changes.next().await, Some(None));
        assert_eq!(changes.next().await, None);
    }

    #[tokio::test]
    async fn test_sign_out_forgets_expired_revocations() {
        let idp = provider();
        let session = idp.create_account("ada@example.com", "secret1").await.unwrap();
        idp.revoked
            .write()
            .await
            .insert("stale".into(), Utc::now().timestamp() - 10);

        idp.sign_out(&session.token).await.unwrap();

        let revoked = idp.revoked.read().await;
        assert_eq!(revoked.len(), 1);
        assert!(!revoked.contains_key("stale"));
        drop(revoked);
        assert!(idp.resolve(&session.token).await.is_err());
    }

    #[tokio::test]
    async fn test_new_watcher_drops_abandoned_ones() {
        let idp = provider();
        let kept = idp.identity_changes("u1");
        let abandoned = idp.identity_changes("u1");
        let other = idp.identity_changes("u2");
        drop(abandoned);
        drop(other);

        let _latest = idp.identity_changes("u1");

        let watchers = idp.watchers.lock().unwrap();
        assert_eq!(watchers.get("u1").map(Vec::len), Some(2));
        assert!(!watchers.contains_key("u2"));
        drop(watchers);
        drop(kept);
    }
}
