//! # Inkwell Infrastructure
//!
//! Concrete implementations of the ports defined in `inkwell-core`.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - In-memory store only
//! - `postgres` - PostgreSQL store via SeaORM
//! - `auth` - Local identity provider (JWT + Argon2)
//! - `rate-limit` - Rate limiting via governor

pub mod store;

#[cfg(feature = "postgres")]
pub mod database;

#[cfg(feature = "auth")]
pub mod auth;

#[cfg(feature = "rate-limit")]
pub mod rate_limit;

pub use store::{CommentFeed, InMemoryDocumentStore};

#[cfg(feature = "postgres")]
pub use database::{DatabaseConfig, PostgresStore};

#[cfg(feature = "auth")]
pub use auth::{JwtConfig, LocalIdentityProvider};

#[cfg(feature = "rate-limit")]
pub use rate_limit::{InMemoryRateLimiter, RateLimitConfig};
