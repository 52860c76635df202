//! Create photos table migration

use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Photos::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Photos::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Photos::Url).string_len(1024).not_null())
                    .col(ColumnDef::new(Photos::PublicId).string_len(255).null())
                    .col(
                        ColumnDef::new(Photos::IsMain)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Photos::IsApproved)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Photos::UserId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_photos_user_id")
                            .from(Photos::Table, Photos::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_photos_user_id")
                    .table(Photos::Table)
                    .col(Photos::UserId)
                    .to_owned(),
            )
            .await?;

        // Moderation queue
        manager
            .create_index(
                Index::create()
                    .name("idx_photos_is_approved")
                    .table(Photos::Table)
                    .col(Photos::IsApproved)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Photos::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Photos {
    Table,
    Id,
    Url,
    PublicId,
    IsMain,
    IsApproved,
    UserId,
}
