//! User entity for database

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;

/// User model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub username: String,
    pub known_as: String,
    pub gender: String,
    pub date_of_birth: NaiveDate,
    pub created: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    #[sea_orm(column_type = "Text", nullable)]
    pub introduction: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub looking_for: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub interests: Option<String>,
    pub city: String,
    pub country: String,
    /// JSON array of role names, e.g. `["Member","Moderator"]`
    #[sea_orm(column_type = "Text")]
    pub roles: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::photo::Entity")]
    Photos,
}

impl Related<super::photo::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Photos.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
