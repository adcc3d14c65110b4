//! Local identity provider: accounts, password hashes and session tokens.

mod jwt;
mod password;
mod provider;

pub use jwt::{JwtConfig, SessionClaims, SessionTokens};
pub use password::Argon2Passwords;
pub use provider::LocalIdentityProvider;
