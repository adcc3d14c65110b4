//! Profile entity for SeaORM, keyed by identity id.

use sea_orm::Set;
use sea_orm::entity::prelude::*;

use inkwell_core::records::ProfileRecord;

use super::post::{column_time, native};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub created_at: Option<DateTimeWithTimeZone>,
    pub last_updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for ProfileRecord {
    fn from(model: Model) -> Self {
        Self {
            name: model.name,
            email: model.email,
            avatar_url: model.avatar_url,
            bio: model.bio,
            created_at: model.created_at.map(native),
            last_updated_at: model.last_updated_at.map(native),
        }
    }
}

pub(crate) fn new_row(id: &str, record: ProfileRecord) -> ActiveModel {
    ActiveModel {
        id: Set(id.to_string()),
        name: Set(record.name),
        email: Set(record.email),
        avatar_url: Set(record.avatar_url),
        bio: Set(record.bio),
        created_at: Set(column_time(record.created_at.as_ref())),
        last_updated_at: Set(column_time(record.last_updated_at.as_ref())),
    }
}
