//! Posts, their comments and user profiles.
//!
//! Everything but the keys is nullable: rows may be partial and are
//! normalized on read.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Posts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Posts::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Posts::Title).string())
                    .col(ColumnDef::new(Posts::Excerpt).string())
                    .col(ColumnDef::new(Posts::Content).text())
                    .col(ColumnDef::new(Posts::Categories).json_binary())
                    .col(ColumnDef::new(Posts::Tags).json_binary())
                    .col(ColumnDef::new(Posts::ImageUrl).string())
                    .col(ColumnDef::new(Posts::Timestamp).timestamp_with_time_zone())
                    .col(ColumnDef::new(Posts::Status).string())
                    .col(ColumnDef::new(Posts::Author).json_binary())
                    .col(ColumnDef::new(Posts::AuthorId).string())
                    .col(ColumnDef::new(Posts::CommentCount).big_integer().default(0))
                    .col(ColumnDef::new(Posts::LastModifiedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_posts_status_timestamp")
                    .table(Posts::Table)
                    .col(Posts::Status)
                    .col(Posts::Timestamp)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_posts_author_id")
                    .table(Posts::Table)
                    .col(Posts::AuthorId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Comments::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Comments::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Comments::PostId).string().not_null())
                    .col(ColumnDef::new(Comments::UserId).string())
                    .col(ColumnDef::new(Comments::User).json_binary())
                    .col(ColumnDef::new(Comments::Content).text())
                    .col(ColumnDef::new(Comments::Timestamp).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comments_post_id")
                            .from(Comments::Table, Comments::PostId)
                            .to(Posts::Table, Posts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_comments_post_id")
                    .table(Comments::Table)
                    .col(Comments::PostId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Users::Name).string())
                    .col(ColumnDef::new(Users::Email).string())
                    .col(ColumnDef::new(Users::AvatarUrl).string())
                    .col(ColumnDef::new(Users::Bio).string())
                    .col(ColumnDef::new(Users::CreatedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Users::LastUpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Comments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Posts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Posts {
    Table,
    Id,
    Title,
    Excerpt,
    Content,
    Categories,
    Tags,
    ImageUrl,
    Timestamp,
    Status,
    Author,
    AuthorId,
    CommentCount,
    LastModifiedAt,
}

#[derive(DeriveIden)]
enum Comments {
    Table,
    Id,
    PostId,
    UserId,
    User,
    Content,
    Timestamp,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Name,
    Email,
    AvatarUrl,
    Bio,
    CreatedAt,
    LastUpdatedAt,
}
