//! In-memory storage implementation
//!
//! Users are kept whole (photos embedded) in a `DashMap`; every photo
//! mutation happens while holding the owner's entry, so a main-photo swap
//! or a removal with promotion is never observed half-applied.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;

use crate::domain::{
    DomainError, DomainResult, MainPhotoSwap, MemberQuery, NewPhoto, NewUser, Photo,
    PhotoForApproval, PhotoRemoval, PhotoRepository, RepositoryProvider, Role, SortBy, User,
    UserRepository,
};
use crate::shared::PagedList;

/// In-memory store for development and testing
pub struct InMemoryStore {
    users: DashMap<i32, User>,
    /// photo id → owner id
    photo_owners: DashMap<i32, i32>,
    user_counter: AtomicI32,
    photo_counter: AtomicI32,
    read_only: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            photo_owners: DashMap::new(),
            user_counter: AtomicI32::new(1),
            photo_counter: AtomicI32::new(1),
            read_only: AtomicBool::new(false),
        }
    }

    /// While read-only, every write is refused the way a failing database
    /// would refuse it.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    fn is_read_only(&self) -> bool {
        self.read_only.load(Ordering::SeqCst)
    }

    fn refuse_write(&self) -> DomainResult<()> {
        if self.is_read_only() {
            return Err(DomainError::Persistence("Store is read-only".into()));
        }
        Ok(())
    }

    fn find_id_by_username(&self, username: &str) -> Option<i32> {
        self.users
            .iter()
            .find(|e| e.value().username == username)
            .map(|e| *e.key())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn get_user_gender(&self, username: &str) -> DomainResult<Option<String>> {
        Ok(self
            .users
            .iter()
            .find(|e| e.value().username == username)
            .map(|e| e.value().gender.clone()))
    }

    async fn get_members(
        &self,
        query: &MemberQuery,
        today: NaiveDate,
    ) -> DomainResult<PagedList<User>> {
        let mut matching: Vec<User> = self
            .users
            .iter()
            .filter(|e| query.matches(e.value(), today))
            .map(|e| e.value().clone())
            .collect();

        match query.sort_by {
            SortBy::LastActive => {
                matching.sort_by(|a, b| b.last_active.cmp(&a.last_active).then(a.id.cmp(&b.id)))
            }
            SortBy::Created => {
                matching.sort_by(|a, b| b.created.cmp(&a.created).then(a.id.cmp(&b.id)))
            }
        }

        Ok(PagedList::from_sequence(matching, query.page))
    }

    async fn get_user_by_username(&self, username: &str) -> DomainResult<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|e| e.value().username == username)
            .map(|e| e.value().clone()))
    }

    async fn save_profile(&self, user: &User) -> DomainResult<bool> {
        if self.is_read_only() {
            return Ok(false);
        }
        let Some(mut stored) = self.users.get_mut(&user.id) else {
            return Ok(false);
        };

        let before = (
            stored.introduction.clone(),
            stored.looking_for.clone(),
            stored.interests.clone(),
            stored.city.clone(),
            stored.country.clone(),
        );
        stored.introduction = user.introduction.clone();
        stored.looking_for = user.looking_for.clone();
        stored.interests = user.interests.clone();
        stored.city = user.city.clone();
        stored.country = user.country.clone();

        let after = (
            stored.introduction.clone(),
            stored.looking_for.clone(),
            stored.interests.clone(),
            stored.city.clone(),
            stored.country.clone(),
        );
        Ok(before != after)
    }

    async fn touch_last_active(&self, username: &str, at: DateTime<Utc>) -> DomainResult<()> {
        self.refuse_write()?;
        if let Some(id) = self.find_id_by_username(username) {
            if let Some(mut user) = self.users.get_mut(&id) {
                user.last_active = at;
            }
        }
        Ok(())
    }

    async fn list_users_with_roles(&self) -> DomainResult<Vec<User>> {
        let mut users: Vec<User> = self
            .users
            .iter()
            .map(|e| {
                let mut u = e.value().clone();
                u.photos.clear();
                u
            })
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn set_roles(&self, username: &str, roles: &[Role]) -> DomainResult<bool> {
        self.refuse_write()?;
        let Some(id) = self.find_id_by_username(username) else {
            return Ok(false);
        };
        match self.users.get_mut(&id) {
            Some(mut user) => {
                user.roles = roles.to_vec();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create_user(&self, new: NewUser) -> DomainResult<User> {
        self.refuse_write()?;
        let username = new.username.to_lowercase();
        if self.find_id_by_username(&username).is_some() {
            return Err(DomainError::Validation(format!(
                "Username '{}' is taken",
                username
            )));
        }

        let now = Utc::now();
        let user = User {
            id: self.user_counter.fetch_add(1, Ordering::SeqCst),
            username,
            known_as: new.known_as,
            gender: new.gender,
            date_of_birth: new.date_of_birth,
            created: now,
            last_active: now,
            introduction: None,
            looking_for: None,
            interests: None,
            city: new.city,
            country: new.country,
            roles: new.roles,
            photos: Vec::new(),
        };
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn count_users(&self) -> DomainResult<u64> {
        Ok(self.users.len() as u64)
    }
}

#[async_trait]
impl PhotoRepository for InMemoryStore {
    async fn add_photo(&self, user_id: i32, photo: NewPhoto) -> DomainResult<Photo> {
        self.refuse_write()?;
        let mut user = self
            .users
            .get_mut(&user_id)
            .ok_or_else(|| DomainError::Persistence(format!("User {} vanished", user_id)))?;

        let stored = Photo {
            id: self.photo_counter.fetch_add(1, Ordering::SeqCst),
            url: photo.url,
            public_id: photo.public_id,
            is_main: user.photos.is_empty(),
            is_approved: false,
            user_id,
        };
        user.photos.push(stored.clone());
        self.photo_owners.insert(stored.id, user_id);
        Ok(stored)
    }

    async fn swap_main_photo(&self, user_id: i32, swap: MainPhotoSwap) -> DomainResult<bool> {
        if self.is_read_only() {
            return Ok(false);
        }
        let Some(mut user) = self.users.get_mut(&user_id) else {
            return Ok(false);
        };
        if !user.photos.iter().any(|p| p.id == swap.next) {
            return Ok(false);
        }

        let mut changed = false;
        for p in user.photos.iter_mut() {
            let should_be_main = p.id == swap.next;
            if p.is_main != should_be_main {
                p.is_main = should_be_main;
                changed = true;
            }
        }
        Ok(changed)
    }

    async fn remove_photo(&self, photo_id: i32) -> DomainResult<PhotoRemoval> {
        self.refuse_write()?;
        let Some(owner) = self.photo_owners.get(&photo_id).map(|e| *e.value()) else {
            return Ok(PhotoRemoval::Missing);
        };
        let Some(mut user) = self.users.get_mut(&owner) else {
            return Ok(PhotoRemoval::Missing);
        };
        let Some(index) = user.photos.iter().position(|p| p.id == photo_id) else {
            return Ok(PhotoRemoval::Missing);
        };

        let removed = user.photos.remove(index);
        self.photo_owners.remove(&photo_id);

        let mut promoted = None;
        if removed.is_main {
            if let Some(next) = user.photos.iter_mut().min_by_key(|p| p.id) {
                next.is_main = true;
                promoted = Some(next.id);
            }
        }
        Ok(PhotoRemoval::Removed { promoted })
    }

    async fn get_photo_by_id(&self, photo_id: i32) -> DomainResult<Option<Photo>> {
        let Some(owner) = self.photo_owners.get(&photo_id).map(|e| *e.value()) else {
            return Ok(None);
        };
        Ok(self
            .users
            .get(&owner)
            .and_then(|u| u.photos.iter().find(|p| p.id == photo_id).cloned()))
    }

    async fn get_unapproved_photos(&self) -> DomainResult<Vec<PhotoForApproval>> {
        let mut pending: Vec<PhotoForApproval> = self
            .users
            .iter()
            .flat_map(|e| {
                let username = e.value().username.clone();
                e.value()
                    .photos
                    .iter()
                    .filter(|p| !p.is_approved)
                    .map(|p| PhotoForApproval {
                        id: p.id,
                        url: p.url.clone(),
                        username: username.clone(),
                        is_approved: p.is_approved,
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        pending.sort_by_key(|p| p.id);
        Ok(pending)
    }

    async fn approve_photo(&self, photo_id: i32) -> DomainResult<bool> {
        self.refuse_write()?;
        let Some(owner) = self.photo_owners.get(&photo_id).map(|e| *e.value()) else {
            return Ok(false);
        };
        let Some(mut user) = self.users.get_mut(&owner) else {
            return Ok(false);
        };
        match user.photos.iter_mut().find(|p| p.id == photo_id) {
            Some(photo) => {
                photo.is_approved = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl RepositoryProvider for InMemoryStore {
    fn users(&self) -> &dyn UserRepository {
        self
    }

    fn photos(&self) -> &dyn PhotoRepository {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::PageRequest;

    fn new_user(username: &str, gender: &str, year: i32) -> NewUser {
        NewUser {
            username: username.to_string(),
            known_as: username.to_string(),
            gender: gender.to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(year, 3, 10).unwrap(),
            city: "Oslo".into(),
            country: "Norway".into(),
            roles: vec![Role::Member],
        }
    }

    fn new_photo(n: u32) -> NewPhoto {
        NewPhoto {
            url: format!("https://img.example/{n}.jpg"),
            public_id: Some(format!("members/{n}")),
        }
    }

    #[tokio::test]
    async fn first_photo_becomes_main() {
        let store = InMemoryStore::new();
        let user = store.create_user(new_user("ann", "female", 1990)).await.unwrap();

        let p1 = store.add_photo(user.id, new_photo(1)).await.unwrap();
        let p2 = store.add_photo(user.id, new_photo(2)).await.unwrap();

        assert!(p1.is_main);
        assert!(!p2.is_main);
        assert!(!p1.is_approved);
    }

    #[tokio::test]
    async fn removing_main_promotes_oldest_remaining() {
        let store = InMemoryStore::new();
        let user = store.create_user(new_user("ann", "female", 1990)).await.unwrap();
        let p1 = store.add_photo(user.id, new_photo(1)).await.unwrap();
        let p2 = store.add_photo(user.id, new_photo(2)).await.unwrap();
        store.add_photo(user.id, new_photo(3)).await.unwrap();

        let removal = store.remove_photo(p1.id).await.unwrap();
        assert_eq!(removal, PhotoRemoval::Removed { promoted: Some(p2.id) });

        let stored = store.get_user_by_username("ann").await.unwrap().unwrap();
        assert_eq!(stored.photos.iter().filter(|p| p.is_main).count(), 1);
        assert_eq!(stored.main_photo().unwrap().id, p2.id);
    }

    #[tokio::test]
    async fn members_exclude_requester_and_filter_gender() {
        let store = InMemoryStore::new();
        store.create_user(new_user("bob", "male", 1990)).await.unwrap();
        store.create_user(new_user("ann", "female", 1991)).await.unwrap();
        store.create_user(new_user("eve", "female", 1992)).await.unwrap();
        store.create_user(new_user("tom", "male", 1993)).await.unwrap();

        let query = MemberQuery {
            gender: "female".into(),
            min_age: 18,
            max_age: 99,
            current_username: "bob".into(),
            sort_by: SortBy::Created,
            page: PageRequest::default(),
        };
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let page = store.get_members(&query, today).await.unwrap();

        let names: Vec<_> = page.items.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(page.total_count, 2);
        assert!(names.contains(&"ann") && names.contains(&"eve"));
    }

    #[tokio::test]
    async fn read_only_store_refuses_writes() {
        let store = InMemoryStore::new();
        let user = store.create_user(new_user("ann", "female", 1990)).await.unwrap();
        store.set_read_only(true);

        assert!(store.add_photo(user.id, new_photo(1)).await.is_err());
        assert!(!store.save_profile(&user).await.unwrap());
    }
}
