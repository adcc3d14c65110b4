//! SeaORM entities for the `posts`, `comments` and `users` tables.

pub mod comment;
pub mod post;
pub mod user;
