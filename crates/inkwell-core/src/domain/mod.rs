//! Domain entities - the canonical in-memory shapes handed to callers.

mod comment;
mod post;
mod timestamp;
mod user;

pub use comment::Comment;
pub use post::{AuthorSnapshot, NewPost, Post, PostPatch, PostStatus, UNTITLED_POST, UNKNOWN_AUTHOR};
pub use timestamp::RawTimestamp;
pub use user::{DEFAULT_AVATAR_URL, ProfileChanges, UserProfile};
