//! Application state - shared across all handlers.

use std::sync::Arc;

use inkwell_core::ports::{IdentityProvider, ProfileRepository, RateLimiter};
use inkwell_core::{ContentService, SessionContext};
use inkwell_infra::{InMemoryDocumentStore, LocalIdentityProvider};

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub content: ContentService,
    pub profiles: Arc<dyn ProfileRepository>,
    pub identity: Arc<dyn IdentityProvider>,
    /// Guards signup and login. `None` disables limiting.
    pub auth_limiter: Option<Arc<dyn RateLimiter>>,
    /// Whether the limiter may key on forwarding headers.
    pub trust_proxy: bool,
}

impl AppState {
    /// Build the state, preferring PostgreSQL when it is configured and
    /// reachable.
    pub async fn new(config: &AppConfig) -> Self {
        let identity: Arc<dyn IdentityProvider> =
            Arc::new(LocalIdentityProvider::new(config.jwt.clone()));

        #[cfg(feature = "rate-limit")]
        let auth_limiter: Option<Arc<dyn RateLimiter>> = Some(Arc::new(
            inkwell_infra::InMemoryRateLimiter::new(config.auth_rate_limit.clone()),
        ));
        #[cfg(not(feature = "rate-limit"))]
        let auth_limiter: Option<Arc<dyn RateLimiter>> = None;

        #[cfg(feature = "postgres")]
        if let Some(db_config) = &config.database {
            match inkwell_infra::database::connect(db_config).await {
                Ok(conn) => {
                    let store = Arc::new(inkwell_infra::PostgresStore::new(conn));
                    tracing::info!("Application state initialized (postgres)");
                    return Self {
                        content: ContentService::new(store.clone(), store.clone()),
                        profiles: store,
                        identity,
                        auth_limiter,
                        trust_proxy: config.trust_proxy,
                    };
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to connect to database: {}. Using in-memory fallback.",
                        e
                    );
                }
            }
        } else {
            tracing::warn!("DATABASE_URL not set. Running on the in-memory store.");
        }

        tracing::info!("Application state initialized (in-memory)");
        let mut state = Self::in_memory(Arc::new(InMemoryDocumentStore::new()), identity);
        state.auth_limiter = auth_limiter;
        state.trust_proxy = config.trust_proxy;
        state
    }

    /// State over an in-memory store, without rate limiting.
    pub fn in_memory(store: Arc<InMemoryDocumentStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            content: ContentService::new(store.clone(), store.clone()),
            profiles: store,
            identity,
            auth_limiter: None,
            trust_proxy: false,
        }
    }

    /// A fresh session for one request.
    pub fn session(&self) -> SessionContext {
        SessionContext::new(self.identity.clone(), self.profiles.clone())
    }
}
