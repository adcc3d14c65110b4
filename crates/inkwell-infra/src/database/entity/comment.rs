//! Comment entity for SeaORM. One row per entry of a post's comment list.

use sea_orm::Set;
use sea_orm::entity::prelude::*;

use inkwell_core::records::{AuthorRecord, CommentRecord, Stored};

use super::post::{column_time, native};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "comments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub post_id: String,
    pub user_id: Option<String>,
    pub user: Option<Json>,
    #[sea_orm(column_type = "Text", nullable)]
    pub content: Option<String>,
    pub timestamp: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::post::Entity",
        from = "Column::PostId",
        to = "super::post::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Post,
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Post.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Stored<CommentRecord> {
    fn from(model: Model) -> Self {
        let record = CommentRecord {
            user_id: model.user_id,
            user: model
                .user
                .and_then(|v| serde_json::from_value::<AuthorRecord>(v).ok()),
            content: model.content,
            timestamp: model.timestamp.map(native),
        };
        Stored::new(model.id, record)
    }
}

pub(crate) fn new_row(id: &str, post_id: &str, record: CommentRecord) -> ActiveModel {
    ActiveModel {
        id: Set(id.to_string()),
        post_id: Set(post_id.to_string()),
        user_id: Set(record.user_id),
        user: Set(record.user.and_then(|user| serde_json::to_value(user).ok())),
        content: Set(record.content),
        timestamp: Set(column_time(record.timestamp.as_ref())),
    }
}
