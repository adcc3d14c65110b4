//! In-memory document store.
//!
//! Mirrors the layout of a hosted document database: a `posts` collection
//! whose documents each own a `comments` sub-collection, and a `users`
//! collection keyed by identity id. Write times are assigned by the store.
//! Data is lost on process restart.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use inkwell_core::RepoError;
use inkwell_core::domain::{PostPatch, RawTimestamp};
use inkwell_core::ports::{
    CommentListener, CommentRepository, PostQuery, PostRepository, ProfileRepository, Subscription,
};
use inkwell_core::records::{CommentRecord, PostRecord, ProfilePatch, ProfileRecord, Stored};

use super::CommentFeed;

#[derive(Debug, Clone, Default)]
struct PostDocument {
    record: PostRecord,
    comments: BTreeMap<String, CommentRecord>,
}

impl PostDocument {
    fn comment_snapshot(&self) -> Vec<Stored<CommentRecord>> {
        let mut comments: Vec<_> = self
            .comments
            .iter()
            .map(|(id, record)| Stored::new(id.clone(), record.clone()))
            .collect();
        comments.sort_by_key(|c| std::cmp::Reverse(sort_key(c.record.timestamp.as_ref())));
        comments
    }
}

fn sort_key(timestamp: Option<&RawTimestamp>) -> i64 {
    timestamp
        .and_then(RawTimestamp::to_datetime)
        .map_or(i64::MIN, |at| at.timestamp_millis())
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn now() -> RawTimestamp {
    RawTimestamp::Native(Utc::now())
}

/// Document store held in process memory.
pub struct InMemoryDocumentStore {
    posts: RwLock<HashMap<String, PostDocument>>,
    users: RwLock<HashMap<String, ProfileRecord>>,
    feed: CommentFeed,
    unavailable: AtomicBool,
    cascade_fault: Mutex<Option<usize>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            posts: RwLock::new(HashMap::new()),
            users: RwLock::new(HashMap::new()),
            feed: CommentFeed::new(),
            unavailable: AtomicBool::new(false),
            cascade_fault: Mutex::new(None),
        }
    }

    /// Make every call fail as if the backend could not be reached.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Abort the next cascade delete after `deletions` comment deletions
    /// have been staged. `None` clears the fault.
    pub fn fail_cascade_after(&self, deletions: Option<usize>) {
        *self
            .cascade_fault
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = deletions;
    }

    /// File a post record exactly as given, bypassing store-side stamping.
    pub async fn seed_post(&self, id: &str, record: PostRecord) {
        self.posts.write().await.insert(
            id.to_string(),
            PostDocument {
                record,
                comments: BTreeMap::new(),
            },
        );
    }

    /// File a comment record exactly as given. Returns `false` when the
    /// post does not exist.
    pub async fn seed_comment(&self, post_id: &str, id: &str, record: CommentRecord) -> bool {
        let mut posts = self.posts.write().await;
        let Some(doc) = posts.get_mut(post_id) else {
            return false;
        };
        doc.comments.insert(id.to_string(), record);
        self.feed.publish(post_id, &doc.comment_snapshot());
        true
    }

    pub async fn post_count(&self) -> usize {
        self.posts.read().await.len()
    }

    pub async fn comment_count(&self, post_id: &str) -> usize {
        self.posts
            .read()
            .await
            .get(post_id)
            .map_or(0, |doc| doc.comments.len())
    }

    pub fn feed(&self) -> &CommentFeed {
        &self.feed
    }

    fn check(&self) -> Result<(), RepoError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepoError::Connection("document store unavailable".into()));
        }
        Ok(())
    }

    fn take_cascade_fault(&self) -> Option<usize> {
        self.cascade_fault
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PostRepository for InMemoryDocumentStore {
    async fn query(&self, query: &PostQuery) -> Result<Vec<Stored<PostRecord>>, RepoError> {
        self.check()?;
        let posts = self.posts.read().await;
        let mut found: Vec<_> = posts
            .iter()
            .filter(|(_, doc)| query.matches(&doc.record))
            .map(|(id, doc)| Stored::new(id.clone(), doc.record.clone()))
            .collect();
        found.sort_by_key(|p| std::cmp::Reverse(sort_key(p.record.timestamp.as_ref())));
        Ok(found)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Stored<PostRecord>>, RepoError> {
        self.check()?;
        let posts = self.posts.read().await;
        Ok(posts
            .get(id)
            .map(|doc| Stored::new(id, doc.record.clone())))
    }

    async fn insert(&self, record: PostRecord) -> Result<String, RepoError> {
        self.check()?;
        let id = new_id();
        let record = PostRecord {
            timestamp: Some(now()),
            ..record
        };
        self.posts.write().await.insert(
            id.clone(),
            PostDocument {
                record,
                comments: BTreeMap::new(),
            },
        );
        tracing::debug!(post_id = %id, "Post document written");
        Ok(id)
    }

    async fn update(&self, id: &str, patch: PostPatch) -> Result<bool, RepoError> {
        self.check()?;
        let mut posts = self.posts.write().await;
        let Some(doc) = posts.get_mut(id) else {
            return Ok(false);
        };

        let record = &mut doc.record;
        if let Some(title) = patch.title {
            record.title = Some(title);
        }
        if let Some(excerpt) = patch.excerpt {
            record.excerpt = Some(excerpt);
        }
        if let Some(content) = patch.content {
            record.content = Some(content);
        }
        if let Some(categories) = patch.categories {
            record.categories = Some(categories);
        }
        if let Some(tags) = patch.tags {
            record.tags = Some(tags);
        }
        if let Some(status) = patch.status {
            record.status = Some(status);
        }
        if let Some(image_url) = patch.image_url {
            record.image_url = Some(image_url);
        }
        record.last_modified_at = Some(now());
        Ok(true)
    }

    async fn delete_cascade(&self, id: &str) -> Result<(), RepoError> {
        self.check()?;
        let mut posts = self.posts.write().await;
        let Some(doc) = posts.get(id) else {
            return Ok(());
        };

        // Nothing is removed until every comment deletion has been accepted,
        // so an abort at any point leaves the document whole.
        let comments = doc.comments.len();
        if let Some(deleted) = self.take_cascade_fault().filter(|at| *at < comments) {
            tracing::warn!(post_id = %id, staged = deleted, "Injected fault aborted cascade delete");
            return Err(RepoError::Aborted(format!(
                "cascade delete of post {id} aborted"
            )));
        }

        posts.remove(id);
        tracing::debug!(post_id = %id, comments, "Post and comments deleted");
        self.feed.close(id);
        Ok(())
    }
}

#[async_trait]
impl CommentRepository for InMemoryDocumentStore {
    async fn list(&self, post_id: &str) -> Result<Vec<Stored<CommentRecord>>, RepoError> {
        self.check()?;
        let posts = self.posts.read().await;
        Ok(posts
            .get(post_id)
            .map(PostDocument::comment_snapshot)
            .unwrap_or_default())
    }

    async fn insert(&self, post_id: &str, record: CommentRecord) -> Result<String, RepoError> {
        self.check()?;
        let mut posts = self.posts.write().await;
        let doc = posts.get_mut(post_id).ok_or(RepoError::NotFound)?;

        let id = new_id();
        doc.comments.insert(
            id.clone(),
            CommentRecord {
                timestamp: Some(now()),
                ..record
            },
        );
        self.feed.publish(post_id, &doc.comment_snapshot());
        Ok(id)
    }

    async fn delete(&self, post_id: &str, comment_id: &str) -> Result<(), RepoError> {
        self.check()?;
        let mut posts = self.posts.write().await;
        if let Some(doc) = posts.get_mut(post_id) {
            if doc.comments.remove(comment_id).is_some() {
                self.feed.publish(post_id, &doc.comment_snapshot());
            }
        }
        Ok(())
    }

    async fn watch(
        &self,
        post_id: &str,
        listener: CommentListener,
    ) -> Result<Subscription, RepoError> {
        self.check()?;
        let posts = self.posts.read().await;
        let snapshot = posts
            .get(post_id)
            .map(PostDocument::comment_snapshot)
            .unwrap_or_default();
        Ok(self.feed.register(post_id, listener, snapshot))
    }
}

#[async_trait]
impl ProfileRepository for InMemoryDocumentStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<ProfileRecord>, RepoError> {
        self.check()?;
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn create(&self, id: &str, record: ProfileRecord) -> Result<(), RepoError> {
        self.check()?;
        let record = ProfileRecord {
            created_at: Some(now()),
            ..record
        };
        self.users.write().await.insert(id.to_string(), record);
        Ok(())
    }

    async fn update(&self, id: &str, patch: ProfilePatch) -> Result<(), RepoError> {
        self.check()?;
        let mut users = self.users.write().await;
        let record = users.get_mut(id).ok_or(RepoError::NotFound)?;
        if let Some(name) = patch.name {
            record.name = Some(name);
        }
        if let Some(avatar_url) = patch.avatar_url {
            record.avatar_url = Some(avatar_url);
        }
        if let Some(bio) = patch.bio {
            record.bio = Some(bio);
        }
        record.last_updated_at = Some(now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkwell_core::domain::PostStatus;
    use std::sync::Arc;

    fn post(author: &str, status: PostStatus) -> PostRecord {
        PostRecord {
            title: Some("Hello there".into()),
            author_id: Some(author.into()),
            status: Some(status),
            ..PostRecord::default()
        }
    }

    #[tokio::test]
    async fn test_insert_stamps_timestamp() {
        let store = InMemoryDocumentStore::new();
        let id = PostRepository::insert(&store, post("a", PostStatus::Draft))
            .await
            .unwrap();
        let stored = PostRepository::find_by_id(&store, &id).await.unwrap().unwrap();
        assert!(matches!(stored.record.timestamp, Some(RawTimestamp::Native(_))));
    }

    #[tokio::test]
    async fn test_query_filters_by_status_and_author() {
        let store = InMemoryDocumentStore::new();
        PostRepository::insert(&store, post("a", PostStatus::Draft)).await.unwrap();
        PostRepository::insert(&store, post("a", PostStatus::Published)).await.unwrap();
        PostRepository::insert(&store, post("b", PostStatus::Published)).await.unwrap();

        let published = store
            .query(&PostQuery::with_status(PostStatus::Published))
            .await
            .unwrap();
        assert_eq!(published.len(), 2);

        let drafts = store
            .query(&PostQuery::by_author("a", PostStatus::Draft))
            .await
            .unwrap();
        assert_eq!(drafts.len(), 1);
    }

    #[tokio::test]
    async fn test_update_missing_post_reports_false() {
        let store = InMemoryDocumentStore::new();
        let updated = PostRepository::update(&store, "nope", PostPatch::status(PostStatus::Published))
            .await
            .unwrap();
        assert!(!updated);
    }

    #[tokio::test]
    async fn test_cascade_fault_leaves_everything_in_place() {
        let store = InMemoryDocumentStore::new();
        let id = PostRepository::insert(&store, post("a", PostStatus::Published))
            .await
            .unwrap();
        for _ in 0..3 {
            CommentRepository::insert(&store, &id, CommentRecord::default())
                .await
                .unwrap();
        }

        store.fail_cascade_after(Some(2));
        let err = store.delete_cascade(&id).await.unwrap_err();
        assert!(matches!(err, RepoError::Aborted(_)));
        assert_eq!(store.post_count().await, 1);
        assert_eq!(store.comment_count(&id).await, 3);

        store.delete_cascade(&id).await.unwrap();
        assert_eq!(store.post_count().await, 0);
        assert_eq!(store.comment_count(&id).await, 0);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_every_call() {
        let store = InMemoryDocumentStore::new();
        store.set_unavailable(true);
        let err = store.query(&PostQuery::all()).await.unwrap_err();
        assert!(matches!(err, RepoError::Connection(_)));
        assert!(ProfileRepository::find_by_id(&store, "u").await.is_err());
    }

    #[tokio::test]
    async fn test_watch_follows_inserts_and_deletes() {
        let store = InMemoryDocumentStore::new();
        let id = PostRepository::insert(&store, post("a", PostStatus::Published))
            .await
            .unwrap();

        let sizes = Arc::new(Mutex::new(Vec::new()));
        let sink = sizes.clone();
        let sub = store
            .watch(
                &id,
                Arc::new(move |snapshot: Vec<Stored<CommentRecord>>| {
                    sink.lock().unwrap().push(snapshot.len());
                }),
            )
            .await
            .unwrap();

        let comment_id = CommentRepository::insert(&store, &id, CommentRecord::default())
            .await
            .unwrap();
        CommentRepository::delete(&store, &id, &comment_id).await.unwrap();
        sub.unsubscribe();
        CommentRepository::insert(&store, &id, CommentRecord::default())
            .await
            .unwrap();

        assert_eq!(*sizes.lock().unwrap(), vec![0, 1, 0]);
    }

    #[tokio::test]
    async fn test_cascade_delete_ends_the_comment_feed() {
        let store = InMemoryDocumentStore::new();
        let id = PostRepository::insert(&store, post("a", PostStatus::Published))
            .await
            .unwrap();
        CommentRepository::insert(&store, &id, CommentRecord::default())
            .await
            .unwrap();

        let sizes = Arc::new(Mutex::new(Vec::new()));
        let sink = sizes.clone();
        let _sub = store
            .watch(
                &id,
                Arc::new(move |snapshot: Vec<Stored<CommentRecord>>| {
                    sink.lock().unwrap().push(snapshot.len());
                }),
            )
            .await
            .unwrap();
        assert!(store.feed().has_listeners(&id));

        store.delete_cascade(&id).await.unwrap();
        assert_eq!(*sizes.lock().unwrap(), vec![1, 0]);
        assert!(!store.feed().has_listeners(&id));
    }

    #[tokio::test]
    async fn test_profile_update_requires_existing_record() {
        let store = InMemoryDocumentStore::new();
        let patch = ProfilePatch {
            bio: Some("hi".into()),
            ..ProfilePatch::default()
        };
        assert!(matches!(
            ProfileRepository::update(&store, "u1", patch.clone()).await,
            Err(RepoError::NotFound)
        ));

        store.create("u1", ProfileRecord::default()).await.unwrap();
        ProfileRepository::update(&store, "u1", patch).await.unwrap();
        let record = ProfileRepository::find_by_id(&store, "u1").await.unwrap().unwrap();
        assert_eq!(record.bio.as_deref(), Some("hi"));
        assert!(record.created_at.is_some());
        assert!(record.last_updated_at.is_some());
    }
}
