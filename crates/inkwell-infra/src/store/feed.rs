//! Comment push feed.
//!
//! Listeners are called synchronously by whichever write produced the new
//! snapshot. Stores publish while still holding their write lock so
//! snapshots reach a listener in commit order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use inkwell_core::ports::{CommentListener, Subscription};
use inkwell_core::records::{CommentRecord, Stored};

#[derive(Default)]
struct Listeners {
    next_id: u64,
    by_post: HashMap<String, Vec<(u64, CommentListener)>>,
}

/// Per-post registry of comment listeners.
#[derive(Clone, Default)]
pub struct CommentFeed {
    inner: Arc<Mutex<Listeners>>,
}

impl CommentFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener and hand it the current snapshot.
    pub fn register(
        &self,
        post_id: &str,
        listener: CommentListener,
        snapshot: Vec<Stored<CommentRecord>>,
    ) -> Subscription {
        let id = {
            let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            inner.next_id += 1;
            let id = inner.next_id;
            inner
                .by_post
                .entry(post_id.to_string())
                .or_default()
                .push((id, listener.clone()));
            id
        };
        tracing::debug!(post_id = %post_id, listener = id, "Comment listener registered");

        listener(snapshot);

        let registry: Weak<Mutex<Listeners>> = Arc::downgrade(&self.inner);
        let post_id = post_id.to_string();
        Subscription::new(move || {
            let Some(registry) = registry.upgrade() else {
                return;
            };
            let mut inner = registry.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(listeners) = inner.by_post.get_mut(&post_id) {
                listeners.retain(|(existing, _)| *existing != id);
                if listeners.is_empty() {
                    inner.by_post.remove(&post_id);
                }
            }
            tracing::debug!(post_id = %post_id, listener = id, "Comment listener released");
        })
    }

    /// Push a fresh snapshot to every listener of the post.
    pub fn publish(&self, post_id: &str, snapshot: &[Stored<CommentRecord>]) {
        let listeners: Vec<CommentListener> = {
            let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            match inner.by_post.get(post_id) {
                Some(listeners) => listeners.iter().map(|(_, l)| l.clone()).collect(),
                None => return,
            }
        };
        tracing::trace!(post_id = %post_id, listeners = listeners.len(), "Publishing comment snapshot");
        for listener in listeners {
            listener(snapshot.to_vec());
        }
    }

    /// The post is gone: push one empty snapshot and release every
    /// listener. Subscriptions taken earlier become no-ops.
    pub fn close(&self, post_id: &str) {
        let removed = {
            let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            inner.by_post.remove(post_id)
        };
        let Some(listeners) = removed else {
            return;
        };
        tracing::debug!(post_id = %post_id, listeners = listeners.len(), "Comment feed closed");
        for (_, listener) in listeners {
            listener(Vec::new());
        }
    }

    pub fn has_listeners(&self, post_id: &str) -> bool {
        self.listener_count(post_id) > 0
    }

    pub fn listener_count(&self, post_id: &str) -> usize {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.by_post.get(post_id).map_or(0, Vec::len)
    }
}
