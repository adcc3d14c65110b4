//! Rate limiting for the auth endpoints.

mod memory;

pub use memory::{InMemoryRateLimiter, RateLimitConfig};
