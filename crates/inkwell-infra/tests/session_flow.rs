//! Session lifecycle against the local identity provider and the
//! in-memory profile store.
#![cfg(feature = "auth")]

use std::sync::Arc;

use inkwell_core::domain::{DEFAULT_AVATAR_URL, ProfileChanges};
use inkwell_core::ports::{AuthError, DisplayProfileUpdate, IdentityProvider, ProfileRepository};
use inkwell_core::{DomainError, SessionContext, SessionState};
use inkwell_infra::{InMemoryDocumentStore, JwtConfig, LocalIdentityProvider};

fn setup() -> (Arc<LocalIdentityProvider>, Arc<InMemoryDocumentStore>) {
    let identity = Arc::new(LocalIdentityProvider::new(JwtConfig {
        secret: "integration-secret".into(),
        expiration_hours: 1,
        issuer: "inkwell".into(),
    }));
    (identity, Arc::new(InMemoryDocumentStore::new()))
}

fn session(identity: &Arc<LocalIdentityProvider>, store: &Arc<InMemoryDocumentStore>) -> SessionContext {
    SessionContext::new(identity.clone(), store.clone())
}

#[tokio::test]
async fn test_signup_restore_update_logout() {
    let (identity, store) = setup();

    let mut first = session(&identity, &store);
    let auth = first
        .signup("Grace Hopper", "grace@example.com", "cobol59")
        .await
        .unwrap();
    let uid = auth.identity.uid.clone();

    let record = ProfileRepository::find_by_id(store.as_ref(), &uid)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.bio.as_deref(), Some("Newly registered user."));
    assert_eq!(record.avatar_url.as_deref(), Some(DEFAULT_AVATAR_URL));

    // A second request carrying the token sees the same user.
    let mut second = session(&identity, &store);
    let user = second.restore(&auth.token).await.unwrap();
    assert_eq!(user.id, uid);
    assert_eq!(user.name, "Grace Hopper");

    let updated = second
        .update_profile(ProfileChanges {
            bio: Some("Rear admiral".into()),
            ..ProfileChanges::default()
        })
        .await
        .unwrap();
    assert_eq!(updated.bio.as_deref(), Some("Rear admiral"));
    let record = ProfileRepository::find_by_id(store.as_ref(), &uid)
        .await
        .unwrap()
        .unwrap();
    assert!(record.last_updated_at.is_some());

    second.logout().await.unwrap();
    assert_eq!(second.state(), &SessionState::Anonymous);

    let mut third = session(&identity, &store);
    let err = third.restore(&auth.token).await.unwrap_err();
    assert!(matches!(err, DomainError::Auth(AuthError::InvalidToken(_))));
    assert_eq!(third.state(), &SessionState::Anonymous);
}

#[tokio::test]
async fn test_login_recreates_missing_profile() {
    let (identity, store) = setup();
    identity
        .create_account("ada@example.com", "engine1")
        .await
        .unwrap();

    let mut ctx = session(&identity, &store);
    let auth = ctx.login("ada@example.com", "engine1").await.unwrap();

    let user = ctx.current_user().unwrap();
    assert_eq!(user.name, "ada");
    assert_eq!(user.avatar_url.as_deref(), Some(DEFAULT_AVATAR_URL));
    assert!(
        ProfileRepository::find_by_id(store.as_ref(), &auth.identity.uid)
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn test_sign_in_survives_unreachable_profile_store() {
    let (identity, store) = setup();
    identity
        .create_account("ada@example.com", "engine1")
        .await
        .unwrap();
    store.set_unavailable(true);

    let mut ctx = session(&identity, &store);
    ctx.login("ada@example.com", "engine1").await.unwrap();
    assert_eq!(ctx.current_user().map(|u| u.name.as_str()), Some("ada"));
}

#[tokio::test]
async fn test_follow_tracks_display_changes_until_sign_out() {
    let (identity, store) = setup();
    let mut ctx = session(&identity, &store);
    let auth = ctx.signup("Ada", "ada@example.com", "engine1").await.unwrap();

    let uid = auth.identity.uid.clone();
    let changes = identity.identity_changes(&uid);

    identity
        .update_display_profile(
            &uid,
            DisplayProfileUpdate {
                display_name: Some("Countess".into()),
                photo_url: None,
            },
        )
        .await
        .unwrap();
    identity.sign_out(&auth.token).await.unwrap();

    ctx.follow(changes).await;
    assert_eq!(ctx.state(), &SessionState::Anonymous);
}
