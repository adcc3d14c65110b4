//! Post entity for SeaORM.
//!
//! Columns are nullable so rows carry the same partial shape as document
//! records; the normalizer fills the gaps on read.

use std::str::FromStr;

use chrono::Utc;
use sea_orm::Set;
use sea_orm::entity::prelude::*;

use inkwell_core::domain::{PostStatus, RawTimestamp};
use inkwell_core::records::{AuthorRecord, PostRecord, Stored};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "posts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub title: Option<String>,
    pub excerpt: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub content: Option<String>,
    pub categories: Option<Json>,
    pub tags: Option<Json>,
    pub image_url: Option<String>,
    pub timestamp: Option<DateTimeWithTimeZone>,
    pub status: Option<String>,
    pub author: Option<Json>,
    pub author_id: Option<String>,
    pub comment_count: Option<i64>,
    pub last_modified_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::comment::Entity")]
    Comment,
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub(crate) fn native(at: DateTimeWithTimeZone) -> RawTimestamp {
    RawTimestamp::Native(at.with_timezone(&Utc))
}

pub(crate) fn column_time(timestamp: Option<&RawTimestamp>) -> Option<DateTimeWithTimeZone> {
    timestamp.and_then(RawTimestamp::to_datetime).map(Into::into)
}

fn strings(value: Option<Json>) -> Option<Vec<String>> {
    value.and_then(|v| serde_json::from_value(v).ok())
}

impl From<Model> for Stored<PostRecord> {
    fn from(model: Model) -> Self {
        let record = PostRecord {
            title: model.title,
            excerpt: model.excerpt,
            content: model.content,
            categories: strings(model.categories),
            tags: strings(model.tags),
            image_url: model.image_url,
            timestamp: model.timestamp.map(native),
            status: model.status.and_then(|s| PostStatus::from_str(&s).ok()),
            author: model
                .author
                .and_then(|v| serde_json::from_value::<AuthorRecord>(v).ok()),
            author_id: model.author_id,
            comment_count: model.comment_count.and_then(|n| u64::try_from(n).ok()),
            last_modified_at: model.last_modified_at.map(native),
        };
        Stored::new(model.id, record)
    }
}

/// Row for a new post; the id is assigned by the caller.
pub(crate) fn new_row(id: &str, record: PostRecord) -> ActiveModel {
    ActiveModel {
        id: Set(id.to_string()),
        title: Set(record.title),
        excerpt: Set(record.excerpt),
        content: Set(record.content),
        categories: Set(record.categories.map(Json::from)),
        tags: Set(record.tags.map(Json::from)),
        image_url: Set(record.image_url),
        timestamp: Set(column_time(record.timestamp.as_ref())),
        status: Set(record.status.map(|s| s.as_str().to_string())),
        author: Set(record
            .author
            .and_then(|author| serde_json::to_value(author).ok())),
        author_id: Set(record.author_id),
        comment_count: Set(record.comment_count.and_then(|n| i64::try_from(n).ok())),
        last_modified_at: Set(column_time(record.last_modified_at.as_ref())),
    }
}
