use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use super::{MemberQuery, NewUser, Role, User};
use crate::domain::DomainResult;
use crate::shared::PagedList;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_user_gender(&self, username: &str) -> DomainResult<Option<String>>;

    /// Filtered, ordered page of users (photos included). `today` anchors
    /// the age filter.
    async fn get_members(&self, query: &MemberQuery, today: NaiveDate)
        -> DomainResult<PagedList<User>>;

    /// The full aggregate, including unapproved photos.
    async fn get_user_by_username(&self, username: &str) -> DomainResult<Option<User>>;

    /// Persist editable profile fields. Returns `false` if no row changed.
    async fn save_profile(&self, user: &User) -> DomainResult<bool>;

    async fn touch_last_active(&self, username: &str, at: DateTime<Utc>) -> DomainResult<()>;

    /// All users ordered by username (photos not loaded).
    async fn list_users_with_roles(&self) -> DomainResult<Vec<User>>;

    /// Returns `false` when the user does not exist.
    async fn set_roles(&self, username: &str, roles: &[Role]) -> DomainResult<bool>;

    async fn create_user(&self, user: NewUser) -> DomainResult<User>;

    async fn count_users(&self) -> DomainResult<u64>;
}
