//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that store, identity and rate limiting
//! adapters must implement.

mod auth;
mod rate_limit;
mod repository;
mod subscription;

pub use auth::{AuthError, AuthIdentity, AuthSession, DisplayProfileUpdate, IdentityProvider};
pub use rate_limit::{RateLimitError, RateLimitResult, RateLimiter};
pub use repository::{
    CommentListener, CommentRepository, PostQuery, PostRepository, ProfileRepository,
};
pub use subscription::Subscription;
