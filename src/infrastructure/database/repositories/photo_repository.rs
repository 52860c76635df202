//! SeaORM implementation of PhotoRepository
//!
//! Each write runs in its own transaction; an early return drops the
//! transaction and rolls it back.

use async_trait::async_trait;
use sea_orm::prelude::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::debug;

use super::db_err;
use super::user_repository::photo_model_to_domain;
use crate::domain::{
    DomainResult, MainPhotoSwap, NewPhoto, Photo, PhotoForApproval, PhotoRemoval,
    PhotoRepository,
};
use crate::infrastructure::database::entities::{photo, user};

pub struct SeaOrmPhotoRepository {
    db: DatabaseConnection,
}

impl SeaOrmPhotoRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PhotoRepository for SeaOrmPhotoRepository {
    async fn add_photo(&self, user_id: i32, new: NewPhoto) -> DomainResult<Photo> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let existing = photo::Entity::find()
            .filter(photo::Column::UserId.eq(user_id))
            .count(&txn)
            .await
            .map_err(db_err)?;

        let model = photo::ActiveModel {
            id: NotSet,
            url: Set(new.url),
            public_id: Set(new.public_id),
            is_main: Set(existing == 0),
            is_approved: Set(false),
            user_id: Set(user_id),
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;

        debug!(photo_id = model.id, user_id, is_main = model.is_main, "Photo stored");
        Ok(photo_model_to_domain(model))
    }

    async fn swap_main_photo(&self, user_id: i32, swap: MainPhotoSwap) -> DomainResult<bool> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let target = photo::Entity::find_by_id(swap.next)
            .filter(photo::Column::UserId.eq(user_id))
            .one(&txn)
            .await
            .map_err(db_err)?;
        if target.is_none() {
            return Ok(false);
        }

        // Clear every other main flag the user holds, not only
        // `swap.previous`, so the swap also repairs a duplicate.
        photo::Entity::update_many()
            .col_expr(photo::Column::IsMain, Expr::value(false))
            .filter(photo::Column::UserId.eq(user_id))
            .filter(photo::Column::IsMain.eq(true))
            .filter(photo::Column::Id.ne(swap.next))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        let set = photo::Entity::update_many()
            .col_expr(photo::Column::IsMain, Expr::value(true))
            .filter(photo::Column::Id.eq(swap.next))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;

        Ok(set.rows_affected > 0)
    }

    async fn remove_photo(&self, photo_id: i32) -> DomainResult<PhotoRemoval> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let Some(existing) = photo::Entity::find_by_id(photo_id)
            .one(&txn)
            .await
            .map_err(db_err)?
        else {
            return Ok(PhotoRemoval::Missing);
        };

        photo::Entity::delete_by_id(photo_id)
            .exec(&txn)
            .await
            .map_err(db_err)?;

        let mut promoted = None;
        if existing.is_main {
            let oldest = photo::Entity::find()
                .filter(photo::Column::UserId.eq(existing.user_id))
                .order_by_asc(photo::Column::Id)
                .one(&txn)
                .await
                .map_err(db_err)?;

            if let Some(next) = oldest {
                photo::Entity::update_many()
                    .col_expr(photo::Column::IsMain, Expr::value(true))
                    .filter(photo::Column::Id.eq(next.id))
                    .exec(&txn)
                    .await
                    .map_err(db_err)?;
                promoted = Some(next.id);
            }
        }

        txn.commit().await.map_err(db_err)?;
        Ok(PhotoRemoval::Removed { promoted })
    }

    async fn get_photo_by_id(&self, photo_id: i32) -> DomainResult<Option<Photo>> {
        let model = photo::Entity::find_by_id(photo_id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(photo_model_to_domain))
    }

    async fn get_unapproved_photos(&self) -> DomainResult<Vec<PhotoForApproval>> {
        let rows = photo::Entity::find()
            .filter(photo::Column::IsApproved.eq(false))
            .order_by_asc(photo::Column::Id)
            .find_also_related(user::Entity)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(rows
            .into_iter()
            .map(|(p, owner)| PhotoForApproval {
                id: p.id,
                url: p.url,
                username: owner.map(|u| u.username).unwrap_or_default(),
                is_approved: p.is_approved,
            })
            .collect())
    }

    async fn approve_photo(&self, photo_id: i32) -> DomainResult<bool> {
        let result = photo::Entity::update_many()
            .col_expr(photo::Column::IsApproved, Expr::value(true))
            .filter(photo::Column::Id.eq(photo_id))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected > 0)
    }
}
