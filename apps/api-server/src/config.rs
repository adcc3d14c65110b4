//! Application configuration loaded from environment variables.

use std::env;

use inkwell_infra::JwtConfig;

#[cfg(feature = "postgres")]
use inkwell_infra::DatabaseConfig;

#[cfg(feature = "rate-limit")]
use inkwell_infra::RateLimitConfig;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// `None` runs on the in-memory store.
    #[cfg(feature = "postgres")]
    pub database: Option<DatabaseConfig>,
    pub jwt: JwtConfig,
    /// Key rate limits on `X-Forwarded-For` / `Forwarded` instead of the
    /// socket peer. Only safe behind a proxy that overwrites them.
    pub trust_proxy: bool,
    #[cfg(feature = "rate-limit")]
    pub auth_rate_limit: RateLimitConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            #[cfg(feature = "postgres")]
            database: DatabaseConfig::from_env(),
            jwt: JwtConfig::from_env(),
            trust_proxy: env::var("TRUST_PROXY")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            #[cfg(feature = "rate-limit")]
            auth_rate_limit: RateLimitConfig::from_env(),
        }
    }
}
