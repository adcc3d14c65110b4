//! # Inkwell Core
//!
//! The domain layer of the Inkwell blogging service.
//! Posts, comments and profiles, the record normalizer, the content access
//! layer and the session context. Storage and identity are reached only
//! through the traits in [`ports`].

pub mod content;
pub mod domain;
pub mod error;
pub mod normalize;
pub mod ports;
pub mod records;
pub mod search;
pub mod session;

pub use content::ContentService;
pub use error::{DomainError, RepoError};
pub use session::{SessionContext, SessionState};
