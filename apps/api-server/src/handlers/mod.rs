//! HTTP handlers and route configuration.

mod auth;
mod comments;
mod health;
mod posts;
mod profile;
mod search;
mod views;

use actix_web::web;

use crate::middleware::rate_limit::RateLimitMiddleware;
use crate::state::AppState;

/// Configure all application routes. The state's auth limiter guards
/// signup and login.
pub fn configure_routes(cfg: &mut web::ServiceConfig, state: &AppState) {
    let auth_limiter = state.auth_limiter.clone();
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(health::health_check))
            .service(
                web::scope("/auth")
                    .service(
                        web::resource("/signup")
                            .wrap(RateLimitMiddleware::new(auth_limiter.clone(), state.trust_proxy))
                            .route(web::post().to(auth::signup)),
                    )
                    .service(
                        web::resource("/login")
                            .wrap(RateLimitMiddleware::new(auth_limiter, state.trust_proxy))
                            .route(web::post().to(auth::login)),
                    )
                    .route("/logout", web::post().to(auth::logout))
                    .route("/me", web::get().to(auth::me)),
            )
            .service(
                web::scope("/posts")
                    .route("", web::get().to(posts::list_published))
                    .route("", web::post().to(posts::create))
                    .route("/{id}", web::get().to(posts::get))
                    .route("/{id}", web::patch().to(posts::update))
                    .route("/{id}", web::delete().to(posts::delete))
                    .route("/{id}/comments", web::get().to(comments::list))
                    .route("/{id}/comments", web::post().to(comments::add))
                    .route("/{id}/comments/stream", web::get().to(comments::stream))
                    .route(
                        "/{id}/comments/{comment_id}",
                        web::delete().to(comments::delete),
                    ),
            )
            .route("/me/content", web::get().to(posts::my_content))
            .route("/search", web::get().to(search::search))
            .route("/profile", web::get().to(profile::get))
            .route("/profile", web::patch().to(profile::update)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use serde_json::{Value, json};

    use inkwell_infra::{InMemoryDocumentStore, JwtConfig, LocalIdentityProvider};

    fn state() -> (AppState, Arc<InMemoryDocumentStore>) {
        let store = Arc::new(InMemoryDocumentStore::new());
        let identity = Arc::new(LocalIdentityProvider::new(JwtConfig {
            secret: "handler-tests".into(),
            expiration_hours: 1,
            issuer: "inkwell".into(),
        }));
        (AppState::in_memory(store.clone(), identity), store)
    }

    macro_rules! app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($state.clone()))
                    .configure(|cfg| configure_routes(cfg, &$state)),
            )
            .await
        };
    }

    macro_rules! signup {
        ($app:expr, $name:expr, $email:expr) => {{
            let req = test::TestRequest::post()
                .uri("/api/auth/signup")
                .set_json(json!({ "name": $name, "email": $email, "password": "secret1" }))
                .to_request();
            let body: Value = test::call_and_read_body_json(&$app, req).await;
            body["access_token"].as_str().unwrap().to_string()
        }};
    }

    fn bearer(token: &str) -> (&'static str, String) {
        ("Authorization", format!("Bearer {token}"))
    }

    fn post_form(title: &str, status: &str) -> Value {
        json!({
            "title": title,
            "excerpt": "A short excerpt",
            "content": "Body text",
            "categories": "Travel, Food",
            "tags": "lisbon,",
            "status": status,
        })
    }

    #[actix_web::test]
    async fn test_health() {
        let (state, _) = state();
        let app = app!(state);
        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/health").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_signup_then_me() {
        let (state, _) = state();
        let app = app!(state);
        let token = signup!(app, "Grace Hopper", "grace@example.com");

        let req = test::TestRequest::get()
            .uri("/api/auth/me")
            .insert_header(bearer(&token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["name"], "Grace Hopper");
        assert_eq!(body["bio"], "Newly registered user.");
        assert_eq!(
            body["avatarUrl"],
            "https://upload.wikimedia.org/wikipedia/commons/7/7c/Profile_avatar_placeholder_large.png?20150327203541"
        );
    }

    #[actix_web::test]
    async fn test_signup_validation_lists_every_error() {
        let (state, _) = state();
        let app = app!(state);
        let req = test::TestRequest::post()
            .uri("/api/auth/signup")
            .set_json(json!({ "name": "G", "email": "nope", "password": "1" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["errors"].as_array().map(Vec::len), Some(3));
    }

    #[actix_web::test]
    async fn test_duplicate_signup_conflicts() {
        let (state, _) = state();
        let app = app!(state);
        signup!(app, "Grace", "grace@example.com");
        let req = test::TestRequest::post()
            .uri("/api/auth/signup")
            .set_json(json!({ "name": "Grace", "email": "grace@example.com", "password": "secret1" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn test_logout_revokes_token() {
        let (state, _) = state();
        let app = app!(state);
        let token = signup!(app, "Grace", "grace@example.com");

        let req = test::TestRequest::post()
            .uri("/api/auth/logout")
            .insert_header(bearer(&token))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

        let req = test::TestRequest::get()
            .uri("/api/auth/me")
            .insert_header(bearer(&token))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_create_requires_auth() {
        let (state, _) = state();
        let app = app!(state);
        let req = test::TestRequest::post()
            .uri("/api/posts")
            .set_json(post_form("Hello World", "draft"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_draft_visibility_and_publish() {
        let (state, _) = state();
        let app = app!(state);
        let ada = signup!(app, "Ada", "ada@example.com");
        let bob = signup!(app, "Bob", "bob@example.com");

        let req = test::TestRequest::post()
            .uri("/api/posts")
            .insert_header(bearer(&ada))
            .set_json(post_form("Hello World", "draft"))
            .to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;
        let id = created["id"].as_str().unwrap().to_string();
        assert_eq!(created["categories"], json!(["Travel", "Food"]));
        assert_eq!(created["tags"], json!(["lisbon"]));
        assert_eq!(created["commentCount"], 0);

        let anonymous = test::TestRequest::get().uri(&format!("/api/posts/{id}")).to_request();
        assert_eq!(test::call_service(&app, anonymous).await.status(), StatusCode::NOT_FOUND);
        let own = test::TestRequest::get()
            .uri(&format!("/api/posts/{id}"))
            .insert_header(bearer(&ada))
            .to_request();
        assert_eq!(test::call_service(&app, own).await.status(), StatusCode::OK);

        let foreign = test::TestRequest::patch()
            .uri(&format!("/api/posts/{id}"))
            .insert_header(bearer(&bob))
            .set_json(json!({ "status": "published" }))
            .to_request();
        assert_eq!(test::call_service(&app, foreign).await.status(), StatusCode::FORBIDDEN);

        let publish = test::TestRequest::patch()
            .uri(&format!("/api/posts/{id}"))
            .insert_header(bearer(&ada))
            .set_json(json!({ "status": "published" }))
            .to_request();
        let published: Value = test::call_and_read_body_json(&app, publish).await;
        assert_eq!(published["status"], "published");
        assert_eq!(published["title"], "Hello World");
        assert!(published["lastModifiedAt"].is_string());

        let list = test::TestRequest::get().uri("/api/posts").to_request();
        let posts: Value = test::call_and_read_body_json(&app, list).await;
        assert_eq!(posts.as_array().map(Vec::len), Some(1));

        let mine = test::TestRequest::get()
            .uri("/api/me/content")
            .insert_header(bearer(&ada))
            .to_request();
        let mine: Value = test::call_and_read_body_json(&app, mine).await;
        assert_eq!(mine["drafts"].as_array().map(Vec::len), Some(0));
        assert_eq!(mine["published"].as_array().map(Vec::len), Some(1));

        let search = test::TestRequest::get().uri("/api/search?q=travel").to_request();
        let found: Value = test::call_and_read_body_json(&app, search).await;
        assert_eq!(found["results"][0]["id"], id.as_str());
    }

    #[actix_web::test]
    async fn test_short_title_is_rejected() {
        let (state, _) = state();
        let app = app!(state);
        let ada = signup!(app, "Ada", "ada@example.com");
        let req = test::TestRequest::post()
            .uri("/api/posts")
            .insert_header(bearer(&ada))
            .set_json(post_form("Hi", "published"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[actix_web::test]
    async fn test_delete_missing_post_is_no_op() {
        let (state, _) = state();
        let app = app!(state);
        let ada = signup!(app, "Ada", "ada@example.com");
        let req = test::TestRequest::delete()
            .uri("/api/posts/does-not-exist")
            .insert_header(bearer(&ada))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
    }

    #[actix_web::test]
    async fn test_comment_lifecycle() {
        let (state, _) = state();
        let app = app!(state);
        let ada = signup!(app, "Ada", "ada@example.com");
        let bob = signup!(app, "Bob", "bob@example.com");

        let req = test::TestRequest::post()
            .uri("/api/posts")
            .insert_header(bearer(&ada))
            .set_json(post_form("Open for comments", "published"))
            .to_request();
        let post: Value = test::call_and_read_body_json(&app, req).await;
        let id = post["id"].as_str().unwrap().to_string();

        let empty = test::TestRequest::post()
            .uri(&format!("/api/posts/{id}/comments"))
            .insert_header(bearer(&bob))
            .set_json(json!({ "content": "   " }))
            .to_request();
        assert_eq!(
            test::call_service(&app, empty).await.status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );

        let add = test::TestRequest::post()
            .uri(&format!("/api/posts/{id}/comments"))
            .insert_header(bearer(&bob))
            .set_json(json!({ "content": " Lovely " }))
            .to_request();
        let comment: Value = test::call_and_read_body_json(&app, add).await;
        assert_eq!(comment["content"], "Lovely");
        assert_eq!(comment["user"]["name"], "Bob");
        let comment_id = comment["id"].as_str().unwrap().to_string();

        let list = test::TestRequest::get()
            .uri(&format!("/api/posts/{id}/comments"))
            .to_request();
        let comments: Value = test::call_and_read_body_json(&app, list).await;
        assert_eq!(comments.as_array().map(Vec::len), Some(1));

        let foreign = test::TestRequest::delete()
            .uri(&format!("/api/posts/{id}/comments/{comment_id}"))
            .insert_header(bearer(&ada))
            .to_request();
        assert_eq!(test::call_service(&app, foreign).await.status(), StatusCode::FORBIDDEN);

        let own = test::TestRequest::delete()
            .uri(&format!("/api/posts/{id}/comments/{comment_id}"))
            .insert_header(bearer(&bob))
            .to_request();
        assert_eq!(test::call_service(&app, own).await.status(), StatusCode::NO_CONTENT);
    }

    #[actix_web::test]
    async fn test_comment_stream_is_event_stream() {
        let (state, _) = state();
        let app = app!(state);
        let ada = signup!(app, "Ada", "ada@example.com");
        let req = test::TestRequest::post()
            .uri("/api/posts")
            .insert_header(bearer(&ada))
            .set_json(post_form("Streaming post", "published"))
            .to_request();
        let post: Value = test::call_and_read_body_json(&app, req).await;

        let req = test::TestRequest::get()
            .uri(&format!("/api/posts/{}/comments/stream", post["id"].as_str().unwrap()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("content-type").and_then(|v| v.to_str().ok()),
            Some("text/event-stream")
        );

        let missing = test::TestRequest::get()
            .uri("/api/posts/nope/comments/stream")
            .to_request();
        assert_eq!(test::call_service(&app, missing).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_comment_stream_ends_when_post_is_deleted() {
        let (state, _) = state();
        let app = app!(state);
        let ada = signup!(app, "Ada", "ada@example.com");
        let req = test::TestRequest::post()
            .uri("/api/posts")
            .insert_header(bearer(&ada))
            .set_json(post_form("Short lived post", "published"))
            .to_request();
        let post: Value = test::call_and_read_body_json(&app, req).await;
        let id = post["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::get()
            .uri(&format!("/api/posts/{id}/comments/stream"))
            .to_request();
        let stream = test::call_service(&app, req).await;

        let req = test::TestRequest::delete()
            .uri(&format!("/api/posts/{id}"))
            .insert_header(bearer(&ada))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

        let body = tokio::time::timeout(std::time::Duration::from_secs(5), test::read_body(stream))
            .await
            .expect("stream should end once the post is gone");
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert_eq!(body.matches("event: comments\n").count(), 2);
        assert!(body.ends_with("data: []\n\n"));
    }

    #[actix_web::test]
    async fn test_profile_update() {
        let (state, _) = state();
        let app = app!(state);
        let ada = signup!(app, "Ada", "ada@example.com");

        let req = test::TestRequest::patch()
            .uri("/api/profile")
            .insert_header(bearer(&ada))
            .set_json(json!({ "name": "Countess", "bio": "Analyst" }))
            .to_request();
        let user: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(user["name"], "Countess");

        let req = test::TestRequest::get()
            .uri("/api/profile")
            .insert_header(bearer(&ada))
            .to_request();
        let user: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(user["bio"], "Analyst");
        assert_eq!(user["name"], "Countess");
    }

    #[actix_web::test]
    async fn test_empty_search_returns_nothing() {
        let (state, _) = state();
        let app = app!(state);
        let req = test::TestRequest::get().uri("/api/search?q=%20").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["results"], json!([]));
    }

    #[actix_web::test]
    async fn test_unavailable_store_is_503() {
        let (state, store) = state();
        let app = app!(state);
        store.set_unavailable(true);
        let req = test::TestRequest::get().uri("/api/posts").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[cfg(feature = "rate-limit")]
    fn limited(trust_proxy: bool) -> AppState {
        use inkwell_infra::{InMemoryRateLimiter, RateLimitConfig};

        let (mut state, _) = state();
        state.auth_limiter = Some(Arc::new(InMemoryRateLimiter::new(RateLimitConfig {
            max_requests: 1,
            window: std::time::Duration::from_secs(60),
        })));
        state.trust_proxy = trust_proxy;
        state
    }

    #[cfg(feature = "rate-limit")]
    fn login_from(forwarded_for: &str) -> test::TestRequest {
        test::TestRequest::post()
            .uri("/api/auth/login")
            .peer_addr("203.0.113.7:50000".parse().unwrap())
            .insert_header(("X-Forwarded-For", forwarded_for))
            .set_json(json!({ "email": "ada@example.com", "password": "secret1" }))
    }

    #[cfg(feature = "rate-limit")]
    #[actix_web::test]
    async fn test_login_is_rate_limited() {
        let state = limited(false);
        let app = app!(state);

        let resp = test::call_service(&app, login_from("198.51.100.1").to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = test::call_service(&app, login_from("198.51.100.1").to_request()).await;
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(resp.headers().contains_key("retry-after"));
    }

    #[cfg(feature = "rate-limit")]
    #[actix_web::test]
    async fn test_forwarded_header_does_not_reset_the_limit() {
        let state = limited(false);
        let app = app!(state);

        for n in 1..=3 {
            let forwarded = format!("198.51.100.{n}");
            let resp = test::call_service(&app, login_from(&forwarded).to_request()).await;
            let expected = if n == 1 {
                StatusCode::UNAUTHORIZED
            } else {
                StatusCode::TOO_MANY_REQUESTS
            };
            assert_eq!(resp.status(), expected, "attempt {n}");
        }
    }

    #[cfg(feature = "rate-limit")]
    #[actix_web::test]
    async fn test_trusted_proxy_keys_on_forwarded_client() {
        let state = limited(true);
        let app = app!(state);

        let first = test::call_service(&app, login_from("198.51.100.1").to_request()).await;
        let second = test::call_service(&app, login_from("198.51.100.2").to_request()).await;
        assert_eq!(first.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(second.status(), StatusCode::UNAUTHORIZED);

        let again = test::call_service(&app, login_from("198.51.100.1").to_request()).await;
        assert_eq!(again.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
