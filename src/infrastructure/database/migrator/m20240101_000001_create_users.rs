//! Create users table migration

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Users::Username)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::KnownAs).string_len(100).not_null())
                    .col(ColumnDef::new(Users::Gender).string_len(20).not_null())
                    .col(ColumnDef::new(Users::DateOfBirth).date().not_null())
                    .col(
                        ColumnDef::new(Users::Created)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Users::LastActive)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Users::Introduction).text().null())
                    .col(ColumnDef::new(Users::LookingFor).text().null())
                    .col(ColumnDef::new(Users::Interests).text().null())
                    .col(ColumnDef::new(Users::City).string_len(100).not_null())
                    .col(ColumnDef::new(Users::Country).string_len(100).not_null())
                    .col(
                        ColumnDef::new(Users::Roles)
                            .text()
                            .not_null()
                            .default("[\"Member\"]"),
                    )
                    .to_owned(),
            )
            .await?;

        // Listing filters on gender and date of birth
        manager
            .create_index(
                Index::create()
                    .name("idx_users_gender_dob")
                    .table(Users::Table)
                    .col(Users::Gender)
                    .col(Users::DateOfBirth)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Users {
    Table,
    Id,
    Username,
    KnownAs,
    Gender,
    DateOfBirth,
    Created,
    LastActive,
    Introduction,
    LookingFor,
    Interests,
    City,
    Country,
    Roles,
}
