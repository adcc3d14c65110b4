//! PostgreSQL implementation of the post, comment and profile ports.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveValue::{NotSet, Set},
    ColumnTrait, DbConn, DbErr, EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use uuid::Uuid;

use inkwell_core::RepoError;
use inkwell_core::domain::PostPatch;
use inkwell_core::ports::{
    CommentListener, CommentRepository, PostQuery, PostRepository, ProfileRepository, Subscription,
};
use inkwell_core::records::{CommentRecord, PostRecord, ProfilePatch, ProfileRecord, Stored};

use super::entity::comment::{self, Entity as CommentEntity};
use super::entity::post::{self, Entity as PostEntity};
use super::entity::user::{self, Entity as UserEntity};
use crate::store::CommentFeed;

fn db_err(err: DbErr) -> RepoError {
    match err {
        DbErr::Conn(e) => RepoError::Connection(e.to_string()),
        DbErr::ConnectionAcquire(e) => RepoError::Connection(e.to_string()),
        other => {
            let message = other.to_string();
            if message.contains("duplicate") || message.contains("violates") {
                RepoError::Constraint(message)
            } else {
                RepoError::Query(message)
            }
        }
    }
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// SeaORM-backed store. Comment listeners are notified after writes made
/// through this adapter; writes from other processes are not observed.
pub struct PostgresStore {
    db: DbConn,
    feed: CommentFeed,
}

impl PostgresStore {
    pub fn new(db: DbConn) -> Self {
        Self {
            db,
            feed: CommentFeed::new(),
        }
    }

    #[cfg(test)]
    pub(super) fn into_db(self) -> DbConn {
        self.db
    }

    async fn comments_of(&self, post_id: &str) -> Result<Vec<Stored<CommentRecord>>, RepoError> {
        let rows = CommentEntity::find()
            .filter(comment::Column::PostId.eq(post_id))
            .order_by_desc(comment::Column::Timestamp)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Re-read the list and push it; a failed re-read only costs the push.
    async fn publish(&self, post_id: &str) {
        if !self.feed.has_listeners(post_id) {
            return;
        }
        match self.comments_of(post_id).await {
            Ok(snapshot) => self.feed.publish(post_id, &snapshot),
            Err(err) => {
                tracing::warn!(post_id = %post_id, error = %err, "Comment snapshot reload failed")
            }
        }
    }
}

#[async_trait]
impl PostRepository for PostgresStore {
    async fn query(&self, query: &PostQuery) -> Result<Vec<Stored<PostRecord>>, RepoError> {
        let mut select = PostEntity::find();
        if let Some(status) = query.status {
            select = select.filter(post::Column::Status.eq(status.as_str()));
        }
        if let Some(author_id) = &query.author_id {
            select = select.filter(post::Column::AuthorId.eq(author_id.as_str()));
        }

        let rows = select
            .order_by_desc(post::Column::Timestamp)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Stored<PostRecord>>, RepoError> {
        let row = PostEntity::find_by_id(id.to_string())
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(row.map(Into::into))
    }

    async fn insert(&self, record: PostRecord) -> Result<String, RepoError> {
        let id = new_id();
        let mut row = post::new_row(&id, record);
        row.timestamp = Set(Some(Utc::now().into()));

        PostEntity::insert(row)
            .exec_without_returning(&self.db)
            .await
            .map_err(db_err)?;
        tracing::debug!(post_id = %id, "Post row inserted");
        Ok(id)
    }

    async fn update(&self, id: &str, patch: PostPatch) -> Result<bool, RepoError> {
        let set_if = |value: Option<String>| value.map_or(NotSet, |v| Set(Some(v)));
        let row = post::ActiveModel {
            id: NotSet,
            title: set_if(patch.title),
            excerpt: set_if(patch.excerpt),
            content: set_if(patch.content),
            categories: patch
                .categories
                .map_or(NotSet, |c| Set(Some(serde_json::Value::from(c)))),
            tags: patch
                .tags
                .map_or(NotSet, |t| Set(Some(serde_json::Value::from(t)))),
            image_url: set_if(patch.image_url),
            timestamp: NotSet,
            status: set_if(patch.status.map(|s| s.as_str().to_string())),
            author: NotSet,
            author_id: NotSet,
            comment_count: NotSet,
            last_modified_at: Set(Some(Utc::now().into())),
        };

        let result = PostEntity::update_many()
            .set(row)
            .filter(post::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected > 0)
    }

    async fn delete_cascade(&self, id: &str) -> Result<(), RepoError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let comments = CommentEntity::delete_many()
            .filter(comment::Column::PostId.eq(id))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        PostEntity::delete_by_id(id.to_string())
            .exec(&txn)
            .await
            .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        tracing::debug!(post_id = %id, comments = comments.rows_affected, "Post and comments deleted");

        self.feed.close(id);
        Ok(())
    }
}

#[async_trait]
impl CommentRepository for PostgresStore {
    async fn list(&self, post_id: &str) -> Result<Vec<Stored<CommentRecord>>, RepoError> {
        self.comments_of(post_id).await
    }

    async fn insert(&self, post_id: &str, record: CommentRecord) -> Result<String, RepoError> {
        let id = new_id();
        let mut row = comment::new_row(&id, post_id, record);
        row.timestamp = Set(Some(Utc::now().into()));

        CommentEntity::insert(row)
            .exec_without_returning(&self.db)
            .await
            .map_err(db_err)?;
        self.publish(post_id).await;
        Ok(id)
    }

    async fn delete(&self, post_id: &str, comment_id: &str) -> Result<(), RepoError> {
        let result = CommentEntity::delete_many()
            .filter(comment::Column::PostId.eq(post_id))
            .filter(comment::Column::Id.eq(comment_id))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        if result.rows_affected > 0 {
            self.publish(post_id).await;
        }
        Ok(())
    }

    async fn watch(
        &self,
        post_id: &str,
        listener: CommentListener,
    ) -> Result<Subscription, RepoError> {
        let snapshot = self.comments_of(post_id).await?;
        Ok(self.feed.register(post_id, listener, snapshot))
    }
}

#[async_trait]
impl ProfileRepository for PostgresStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<ProfileRecord>, RepoError> {
        let row = UserEntity::find_by_id(id.to_string())
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(row.map(Into::into))
    }

    async fn create(&self, id: &str, record: ProfileRecord) -> Result<(), RepoError> {
        let mut row = user::new_row(id, record);
        row.created_at = Set(Some(Utc::now().into()));

        UserEntity::insert(row)
            .on_conflict(
                OnConflict::column(user::Column::Id)
                    .update_columns([
                        user::Column::Name,
                        user::Column::Email,
                        user::Column::AvatarUrl,
                        user::Column::Bio,
                        user::Column::CreatedAt,
                        user::Column::LastUpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn update(&self, id: &str, patch: ProfilePatch) -> Result<(), RepoError> {
        let set_if = |value: Option<String>| value.map_or(NotSet, |v| Set(Some(v)));
        let row = user::ActiveModel {
            id: NotSet,
            name: set_if(patch.name),
            email: NotSet,
            avatar_url: set_if(patch.avatar_url),
            bio: set_if(patch.bio),
            created_at: NotSet,
            last_updated_at: Set(Some(Utc::now().into())),
        };

        let result = UserEntity::update_many()
            .set(row)
            .filter(user::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
