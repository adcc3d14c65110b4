//! Document store adapters - in-memory store and the comment push feed
//! shared by every store implementation.

mod feed;
mod memory;

pub use feed::CommentFeed;
pub use memory::InMemoryDocumentStore;
