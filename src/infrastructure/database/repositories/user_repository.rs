//! SeaORM implementation of UserRepository

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::prelude::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use tracing::debug;

use super::db_err;
use crate::domain::{
    DomainError, DomainResult, MemberQuery, NewUser, Photo, Role, SortBy, User, UserRepository,
};
use crate::infrastructure::database::entities::{photo, user};
use crate::shared::{InfraError, PagedList};

pub struct SeaOrmUserRepository {
    db: DatabaseConnection,
}

impl SeaOrmUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Load the photos of every given user in one query, oldest first.
    async fn with_photos(&self, models: Vec<user::Model>) -> DomainResult<Vec<User>> {
        if models.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = models.iter().map(|m| m.id).collect();
        let photos = photo::Entity::find()
            .filter(photo::Column::UserId.is_in(ids))
            .order_by_asc(photo::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let mut by_owner: HashMap<i32, Vec<Photo>> = HashMap::new();
        for p in photos {
            by_owner
                .entry(p.user_id)
                .or_default()
                .push(photo_model_to_domain(p));
        }

        Ok(models
            .into_iter()
            .map(|m| {
                let photos = by_owner.remove(&m.id).unwrap_or_default();
                user_model_to_domain(m, photos)
            })
            .collect())
    }
}

// ── Conversion helpers ──────────────────────────────────────────

pub(super) fn photo_model_to_domain(model: photo::Model) -> Photo {
    Photo {
        id: model.id,
        url: model.url,
        public_id: model.public_id,
        is_main: model.is_main,
        is_approved: model.is_approved,
        user_id: model.user_id,
    }
}

fn user_model_to_domain(model: user::Model, photos: Vec<Photo>) -> User {
    User {
        id: model.id,
        username: model.username,
        known_as: model.known_as,
        gender: model.gender,
        date_of_birth: model.date_of_birth,
        created: model.created,
        last_active: model.last_active,
        introduction: model.introduction,
        looking_for: model.looking_for,
        interests: model.interests,
        city: model.city,
        country: model.country,
        roles: roles_from_column(&model.roles),
        photos,
    }
}

fn roles_from_column(raw: &str) -> Vec<Role> {
    serde_json::from_str::<Vec<String>>(raw)
        .unwrap_or_default()
        .iter()
        .filter_map(|name| Role::parse(name))
        .collect()
}

fn roles_to_column(roles: &[Role]) -> DomainResult<String> {
    let names: Vec<&str> = roles.iter().map(Role::as_str).collect();
    serde_json::to_string(&names).map_err(|e| InfraError::Serialization(e).into())
}

// ── Repository implementation ───────────────────────────────────

#[async_trait]
impl UserRepository for SeaOrmUserRepository {
    async fn get_user_gender(&self, username: &str) -> DomainResult<Option<String>> {
        let model = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(|m| m.gender))
    }

    async fn get_members(
        &self,
        query: &MemberQuery,
        today: NaiveDate,
    ) -> DomainResult<PagedList<User>> {
        let Some(range) = query.birth_date_range(today) else {
            return Ok(PagedList::new(Vec::new(), 0, query.page));
        };

        let mut select = user::Entity::find()
            .filter(user::Column::Username.ne(query.current_username.as_str()))
            .filter(user::Column::Gender.eq(query.gender.as_str()))
            .filter(user::Column::DateOfBirth.gt(range.born_after))
            .filter(user::Column::DateOfBirth.lte(range.born_on_or_before));

        select = match query.sort_by {
            SortBy::LastActive => select.order_by_desc(user::Column::LastActive),
            SortBy::Created => select.order_by_desc(user::Column::Created),
        }
        .order_by_asc(user::Column::Id);

        let total = select.clone().count(&self.db).await.map_err(db_err)?;

        let models = select
            .offset(query.page.offset())
            .limit(query.page.limit())
            .all(&self.db)
            .await
            .map_err(db_err)?;

        debug!(
            total,
            page = query.page.page,
            returned = models.len(),
            "Member page loaded"
        );

        let items = self.with_photos(models).await?;
        Ok(PagedList::new(items, total, query.page))
    }

    async fn get_user_by_username(&self, username: &str) -> DomainResult<Option<User>> {
        let model = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        match model {
            Some(m) => Ok(self.with_photos(vec![m]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn save_profile(&self, user: &User) -> DomainResult<bool> {
        let result = user::Entity::update_many()
            .col_expr(user::Column::Introduction, Expr::value(user.introduction.clone()))
            .col_expr(user::Column::LookingFor, Expr::value(user.looking_for.clone()))
            .col_expr(user::Column::Interests, Expr::value(user.interests.clone()))
            .col_expr(user::Column::City, Expr::value(user.city.clone()))
            .col_expr(user::Column::Country, Expr::value(user.country.clone()))
            .filter(user::Column::Id.eq(user.id))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected > 0)
    }

    async fn touch_last_active(&self, username: &str, at: DateTime<Utc>) -> DomainResult<()> {
        user::Entity::update_many()
            .col_expr(user::Column::LastActive, Expr::value(at))
            .filter(user::Column::Username.eq(username))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn list_users_with_roles(&self) -> DomainResult<Vec<User>> {
        let models = user::Entity::find()
            .order_by_asc(user::Column::Username)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(models
            .into_iter()
            .map(|m| user_model_to_domain(m, Vec::new()))
            .collect())
    }

    async fn set_roles(&self, username: &str, roles: &[Role]) -> DomainResult<bool> {
        let result = user::Entity::update_many()
            .col_expr(user::Column::Roles, Expr::value(roles_to_column(roles)?))
            .filter(user::Column::Username.eq(username))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected > 0)
    }

    async fn create_user(&self, new: NewUser) -> DomainResult<User> {
        let now = Utc::now();
        let username = new.username.to_lowercase();

        let model = user::ActiveModel {
            id: NotSet,
            username: Set(username.clone()),
            known_as: Set(new.known_as),
            gender: Set(new.gender),
            date_of_birth: Set(new.date_of_birth),
            created: Set(now),
            last_active: Set(now),
            introduction: Set(None),
            looking_for: Set(None),
            interests: Set(None),
            city: Set(new.city),
            country: Set(new.country),
            roles: Set(roles_to_column(&new.roles)?),
        };

        let inserted = model.insert(&self.db).await.map_err(|e| {
            if e.to_string().contains("UNIQUE") {
                DomainError::Validation(format!("Username '{}' is taken", username))
            } else {
                db_err(e)
            }
        })?;

        Ok(user_model_to_domain(inserted, Vec::new()))
    }

    async fn count_users(&self) -> DomainResult<u64> {
        user::Entity::find().count(&self.db).await.map_err(db_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewPhoto, PhotoRepository, UserParams};
    use crate::infrastructure::database::repositories::test_support::test_db;
    use crate::infrastructure::database::repositories::SeaOrmPhotoRepository;

    fn new_user(username: &str, gender: &str, dob: NaiveDate) -> NewUser {
        NewUser {
            username: username.to_string(),
            known_as: username.to_string(),
            gender: gender.to_string(),
            date_of_birth: dob,
            city: "York".to_string(),
            country: "UK".to_string(),
            roles: vec![Role::Member],
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn create_and_load_user_with_photos() {
        let db = test_db().await;
        let users = SeaOrmUserRepository::new(db.clone());
        let photos = SeaOrmPhotoRepository::new(db);

        let created = users
            .create_user(new_user("Lisa", "female", date(1994, 3, 1)))
            .await
            .unwrap();
        assert_eq!(created.username, "lisa");
        assert_eq!(created.roles, vec![Role::Member]);

        photos
            .add_photo(
                created.id,
                NewPhoto {
                    url: "https://img.example/a.jpg".into(),
                    public_id: Some("a".into()),
                },
            )
            .await
            .unwrap();

        let loaded = users.get_user_by_username("lisa").await.unwrap().unwrap();
        assert_eq!(loaded.photos.len(), 1);
        assert!(loaded.photos[0].is_main);
        assert_eq!(
            users.get_user_gender("lisa").await.unwrap().as_deref(),
            Some("female")
        );
        assert!(users.get_user_by_username("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let db = test_db().await;
        let users = SeaOrmUserRepository::new(db);

        users
            .create_user(new_user("lisa", "female", date(1994, 3, 1)))
            .await
            .unwrap();
        let err = users
            .create_user(new_user("LISA", "female", date(1994, 3, 1)))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn members_are_filtered_sorted_and_paged() {
        let db = test_db().await;
        let users = SeaOrmUserRepository::new(db);
        let today = date(2024, 6, 15);

        users
            .create_user(new_user("bob", "male", date(1990, 1, 1)))
            .await
            .unwrap();
        for (name, dob) in [
            ("ann", date(2004, 6, 15)),  // 20 today
            ("cat", date(2004, 6, 16)),  // 19
            ("dee", date(1993, 6, 16)),  // 30
            ("eve", date(1993, 6, 15)),  // 31
            ("fay", date(1999, 1, 1)),   // 25
        ] {
            users
                .create_user(new_user(name, "female", dob))
                .await
                .unwrap();
        }
        users
            .create_user(new_user("gus", "male", date(1999, 1, 1)))
            .await
            .unwrap();

        // make "fay" the most recently active
        users
            .touch_last_active("fay", Utc::now() + chrono::Duration::hours(1))
            .await
            .unwrap();

        let params = UserParams {
            min_age: Some(20),
            max_age: Some(30),
            page_size: Some(2),
            ..Default::default()
        };
        let query = MemberQuery::resolve(&params, "bob", "female".into());
        let page = users.get_members(&query, today).await.unwrap();

        assert_eq!(page.total_count, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].username, "fay");

        let names: Vec<_> = page.items.iter().map(|u| u.username.as_str()).collect();
        assert!(!names.contains(&"bob"));

        let last = MemberQuery {
            page: crate::shared::PageRequest::new(Some(2), Some(2)),
            ..query.clone()
        };
        let page2 = users.get_members(&last, today).await.unwrap();
        assert_eq!(page2.items.len(), 1);

        let beyond = MemberQuery {
            page: crate::shared::PageRequest::new(Some(9), Some(2)),
            ..query
        };
        let empty = users.get_members(&beyond, today).await.unwrap();
        assert!(empty.items.is_empty());
        assert_eq!(empty.total_count, 3);
    }

    #[tokio::test]
    async fn inverted_age_range_yields_empty_page() {
        let db = test_db().await;
        let users = SeaOrmUserRepository::new(db);
        users
            .create_user(new_user("ann", "female", date(2000, 1, 1)))
            .await
            .unwrap();

        let params = UserParams {
            min_age: Some(40),
            max_age: Some(30),
            ..Default::default()
        };
        let query = MemberQuery::resolve(&params, "bob", "female".into());
        let page = users.get_members(&query, date(2024, 1, 1)).await.unwrap();
        assert_eq!(page.total_count, 0);
        assert_eq!(page.total_pages, 0);
    }

    #[tokio::test]
    async fn profile_and_roles_are_persisted() {
        let db = test_db().await;
        let users = SeaOrmUserRepository::new(db);
        let mut lisa = users
            .create_user(new_user("lisa", "female", date(1994, 3, 1)))
            .await
            .unwrap();

        lisa.introduction = Some("hello".into());
        lisa.city = "Bath".into();
        assert!(users.save_profile(&lisa).await.unwrap());

        assert!(users
            .set_roles("lisa", &[Role::Member, Role::Moderator])
            .await
            .unwrap());
        assert!(!users.set_roles("nobody", &[Role::Member]).await.unwrap());

        let loaded = users.get_user_by_username("lisa").await.unwrap().unwrap();
        assert_eq!(loaded.introduction.as_deref(), Some("hello"));
        assert_eq!(loaded.city, "Bath");
        assert_eq!(loaded.roles, vec![Role::Member, Role::Moderator]);

        let all = users.list_users_with_roles().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(users.count_users().await.unwrap(), 1);
    }
}
