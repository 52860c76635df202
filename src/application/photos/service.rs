//! Photo service
//!
//! Keeps the "exactly one main photo once any exist" rule across uploads,
//! main-photo changes, deletions and moderation. Image bytes live on the
//! external host; the store only keeps the URL and the host's public id.

use std::sync::Arc;

use metrics::counter;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::application::{ensure_active, load_caller, require_any_role};
use crate::domain::{
    DomainError, DomainResult, Identity, ImageStorage, ImageUpload, NewPhoto, Photo,
    PhotoForApproval, PhotoRemoval, RepositoryProvider, Role,
};

const MODERATORS: &[Role] = &[Role::Admin, Role::Moderator];

pub struct PhotoService {
    repos: Arc<dyn RepositoryProvider>,
    images: Arc<dyn ImageStorage>,
}

impl PhotoService {
    pub fn new(repos: Arc<dyn RepositoryProvider>, images: Arc<dyn ImageStorage>) -> Self {
        Self { repos, images }
    }

    /// Upload an image and attach it to the caller. The first photo a user
    /// owns becomes their main photo.
    pub async fn add_photo(
        &self,
        identity: &Identity,
        upload: ImageUpload,
        cancel: &CancellationToken,
    ) -> DomainResult<Photo> {
        ensure_active(cancel)?;
        if upload.is_empty() {
            return Err(DomainError::Validation("No file provided".into()));
        }

        let user = load_caller(self.repos.as_ref(), identity).await?;

        let uploaded = self.images.upload(upload).await?;

        if cancel.is_cancelled() {
            self.discard_upload(&uploaded.public_id).await;
            return Err(DomainError::Cancelled);
        }

        let new_photo = NewPhoto {
            url: uploaded.secure_url,
            public_id: Some(uploaded.public_id.clone()),
        };

        match self.repos.photos().add_photo(user.id, new_photo).await {
            Ok(photo) => {
                counter!("photos_uploaded_total").increment(1);
                info!(
                    username = %user.username,
                    photo_id = photo.id,
                    is_main = photo.is_main,
                    "Photo added"
                );
                Ok(photo)
            }
            Err(e) => {
                error!(
                    username = %user.username,
                    public_id = %uploaded.public_id,
                    error = %e,
                    "Failed to store uploaded photo"
                );
                self.discard_upload(&uploaded.public_id).await;
                Err(DomainError::Persistence("Problem adding photo".into()))
            }
        }
    }

    /// Best-effort removal of an asset whose record was never stored.
    async fn discard_upload(&self, public_id: &str) {
        if let Err(e) = self.images.delete(public_id).await {
            warn!(public_id, error = %e, "Orphaned image left on host");
        }
    }

    /// Make one of the caller's photos their main photo. The old main flag
    /// is cleared in the same transaction.
    pub async fn set_main_photo(
        &self,
        identity: &Identity,
        photo_id: i32,
        cancel: &CancellationToken,
    ) -> DomainResult<()> {
        ensure_active(cancel)?;
        let user = load_caller(self.repos.as_ref(), identity).await?;
        let swap = user.plan_main_swap(photo_id)?;

        ensure_active(cancel)?;
        match self.repos.photos().swap_main_photo(user.id, swap).await {
            Ok(true) => {
                info!(
                    username = %user.username,
                    photo_id,
                    previous = ?swap.previous,
                    "Main photo changed"
                );
                Ok(())
            }
            Ok(false) => Err(DomainError::Persistence("Failed to set main photo".into())),
            Err(e) => {
                error!(username = %user.username, photo_id, error = %e, "Main photo swap failed");
                Err(DomainError::Persistence("Failed to set main photo".into()))
            }
        }
    }

    /// Delete one of the caller's photos. The main photo cannot be deleted.
    ///
    /// The hosted image goes first; if the host refuses, the record is left
    /// alone. If the record removal then fails, the record keeps its public
    /// id and a retry converges because the host accepts deleting a missing
    /// asset.
    pub async fn delete_photo(
        &self,
        identity: &Identity,
        photo_id: i32,
        cancel: &CancellationToken,
    ) -> DomainResult<()> {
        ensure_active(cancel)?;
        let user = load_caller(self.repos.as_ref(), identity).await?;
        let photo = user.deletable_photo(photo_id)?.clone();

        ensure_active(cancel)?;
        self.remove(&photo, "Failed to delete photo").await?;

        counter!("photos_deleted_total").increment(1);
        info!(username = %user.username, photo_id, "Photo deleted");
        Ok(())
    }

    /// External delete, then record removal.
    async fn remove(&self, photo: &Photo, failure: &str) -> DomainResult<Option<i32>> {
        if let Some(public_id) = photo.public_id.as_deref() {
            self.images.delete(public_id).await?;
        }

        match self.repos.photos().remove_photo(photo.id).await {
            Ok(PhotoRemoval::Removed { promoted }) => Ok(promoted),
            Ok(PhotoRemoval::Missing) => Err(DomainError::Persistence(failure.to_string())),
            Err(e) => {
                error!(
                    photo_id = photo.id,
                    public_id = ?photo.public_id,
                    error = %e,
                    "Image removed from host but photo record kept"
                );
                Err(DomainError::Persistence(failure.to_string()))
            }
        }
    }

    // ── Moderation ──────────────────────────────────────────────

    pub async fn photos_for_moderation(
        &self,
        identity: &Identity,
    ) -> DomainResult<Vec<PhotoForApproval>> {
        require_any_role(identity, MODERATORS)?;
        self.repos.photos().get_unapproved_photos().await
    }

    pub async fn approve_photo(
        &self,
        identity: &Identity,
        photo_id: i32,
        cancel: &CancellationToken,
    ) -> DomainResult<()> {
        require_any_role(identity, MODERATORS)?;
        ensure_active(cancel)?;

        if !self.repos.photos().approve_photo(photo_id).await? {
            return Err(DomainError::photo_not_found(photo_id));
        }
        info!(moderator = %identity.username, photo_id, "Photo approved");
        Ok(())
    }

    /// Remove a photo from any user. Rejecting a main photo promotes the
    /// owner's oldest remaining photo.
    pub async fn reject_photo(
        &self,
        identity: &Identity,
        photo_id: i32,
        cancel: &CancellationToken,
    ) -> DomainResult<()> {
        require_any_role(identity, MODERATORS)?;
        ensure_active(cancel)?;

        let photo = self
            .repos
            .photos()
            .get_photo_by_id(photo_id)
            .await?
            .ok_or_else(|| DomainError::photo_not_found(photo_id))?;

        let promoted = self.remove(&photo, "Failed to reject photo").await?;
        info!(
            moderator = %identity.username,
            photo_id,
            promoted = ?promoted,
            "Photo rejected"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::{NewUser, PhotoRepository, User, UserRepository};
    use crate::infrastructure::image_host::fake::FakeImageHost;
    use crate::infrastructure::storage::InMemoryStore;

    struct Fixture {
        svc: PhotoService,
        store: Arc<InMemoryStore>,
        host: Arc<FakeImageHost>,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        for (name, roles) in [
            ("lisa", vec![Role::Member]),
            ("todd", vec![Role::Member]),
            ("mod", vec![Role::Member, Role::Moderator]),
        ] {
            store
                .create_user(NewUser {
                    username: name.into(),
                    known_as: name.into(),
                    gender: "female".into(),
                    date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
                    city: "Leeds".into(),
                    country: "UK".into(),
                    roles,
                })
                .await
                .unwrap();
        }
        let host = Arc::new(FakeImageHost::default());
        Fixture {
            svc: PhotoService::new(store.clone(), host.clone()),
            store,
            host,
        }
    }

    fn lisa() -> Identity {
        Identity::new("lisa", vec![Role::Member])
    }

    fn moderator() -> Identity {
        Identity::new("mod", vec![Role::Member, Role::Moderator])
    }

    fn upload(name: &str) -> ImageUpload {
        ImageUpload {
            file_name: name.into(),
            content_type: Some("image/jpeg".into()),
            bytes: vec![0xFF, 0xD8, 0xFF],
        }
    }

    async fn reload(store: &InMemoryStore, username: &str) -> User {
        store.get_user_by_username(username).await.unwrap().unwrap()
    }

    fn main_count(user: &User) -> usize {
        user.photos.iter().filter(|p| p.is_main).count()
    }

    fn live() -> CancellationToken {
        CancellationToken::new()
    }

    #[tokio::test]
    async fn first_upload_becomes_main() {
        let f = fixture().await;
        let first = f.svc.add_photo(&lisa(), upload("a.jpg"), &live()).await.unwrap();
        let second = f.svc.add_photo(&lisa(), upload("b.jpg"), &live()).await.unwrap();

        assert!(first.is_main);
        assert!(!second.is_main);
        assert!(!first.is_approved);
        assert_eq!(main_count(&reload(&f.store, "lisa").await), 1);
        assert_eq!(f.host.stored().len(), 2);
    }

    #[tokio::test]
    async fn empty_upload_is_rejected_before_host_call() {
        let f = fixture().await;
        let empty = ImageUpload {
            bytes: Vec::new(),
            ..upload("a.jpg")
        };
        let err = f.svc.add_photo(&lisa(), empty, &live()).await.unwrap_err();
        assert_eq!(err.to_string(), "No file provided");
        assert!(f.host.stored().is_empty());
    }

    #[tokio::test]
    async fn host_upload_error_passes_through() {
        let f = fixture().await;
        f.host.fail_uploads("Invalid image file");

        let err = f.svc.add_photo(&lisa(), upload("a.jpg"), &live()).await.unwrap_err();
        assert!(matches!(err, DomainError::ExternalService(ref m) if m == "Invalid image file"));
        assert!(reload(&f.store, "lisa").await.photos.is_empty());
    }

    #[tokio::test]
    async fn failed_save_discards_uploaded_image() {
        let f = fixture().await;
        f.store.set_read_only(true);

        let err = f.svc.add_photo(&lisa(), upload("a.jpg"), &live()).await.unwrap_err();
        assert_eq!(err.to_string(), "Problem adding photo");
        assert!(f.host.stored().is_empty());
        assert_eq!(f.host.deleted().len(), 1);
    }

    #[tokio::test]
    async fn set_main_swaps_in_one_step() {
        let f = fixture().await;
        let a = f.svc.add_photo(&lisa(), upload("a.jpg"), &live()).await.unwrap();
        let b = f.svc.add_photo(&lisa(), upload("b.jpg"), &live()).await.unwrap();

        f.svc.set_main_photo(&lisa(), b.id, &live()).await.unwrap();

        let user = reload(&f.store, "lisa").await;
        assert_eq!(main_count(&user), 1);
        assert_eq!(user.main_photo().map(|p| p.id), Some(b.id));
        assert!(!user.photo(a.id).unwrap().is_main);
    }

    #[tokio::test]
    async fn set_main_twice_reports_already_main() {
        let f = fixture().await;
        f.svc.add_photo(&lisa(), upload("a.jpg"), &live()).await.unwrap();
        let b = f.svc.add_photo(&lisa(), upload("b.jpg"), &live()).await.unwrap();

        f.svc.set_main_photo(&lisa(), b.id, &live()).await.unwrap();
        let err = f.svc.set_main_photo(&lisa(), b.id, &live()).await.unwrap_err();
        assert_eq!(err.to_string(), "This is already your main photo");
        assert_eq!(main_count(&reload(&f.store, "lisa").await), 1);
    }

    #[tokio::test]
    async fn set_main_on_someone_elses_photo_is_not_found() {
        let f = fixture().await;
        let todd = Identity::new("todd", vec![Role::Member]);
        let theirs = f.svc.add_photo(&todd, upload("t.jpg"), &live()).await.unwrap();

        let err = f.svc.set_main_photo(&lisa(), theirs.id, &live()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn set_main_store_failure_is_reported() {
        let f = fixture().await;
        f.svc.add_photo(&lisa(), upload("a.jpg"), &live()).await.unwrap();
        let b = f.svc.add_photo(&lisa(), upload("b.jpg"), &live()).await.unwrap();
        f.store.set_read_only(true);

        let err = f.svc.set_main_photo(&lisa(), b.id, &live()).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to set main photo");
    }

    #[tokio::test]
    async fn main_photo_cannot_be_deleted() {
        let f = fixture().await;
        let a = f.svc.add_photo(&lisa(), upload("a.jpg"), &live()).await.unwrap();
        f.svc.add_photo(&lisa(), upload("b.jpg"), &live()).await.unwrap();

        let before = reload(&f.store, "lisa").await;
        let err = f.svc.delete_photo(&lisa(), a.id, &live()).await.unwrap_err();
        assert_eq!(err.to_string(), "You cannot delete your main photo");

        let after = reload(&f.store, "lisa").await;
        assert_eq!(before.photos, after.photos);
        assert!(f.host.deleted().is_empty());
    }

    #[tokio::test]
    async fn delete_removes_host_image_and_record() {
        let f = fixture().await;
        f.svc.add_photo(&lisa(), upload("a.jpg"), &live()).await.unwrap();
        let b = f.svc.add_photo(&lisa(), upload("b.jpg"), &live()).await.unwrap();

        f.svc.delete_photo(&lisa(), b.id, &live()).await.unwrap();

        let user = reload(&f.store, "lisa").await;
        assert_eq!(user.photos.len(), 1);
        assert_eq!(main_count(&user), 1);
        assert_eq!(f.host.deleted(), vec![b.public_id.unwrap()]);
    }

    #[tokio::test]
    async fn photo_without_public_id_skips_host() {
        let f = fixture().await;
        f.svc.add_photo(&lisa(), upload("a.jpg"), &live()).await.unwrap();
        let user = reload(&f.store, "lisa").await;
        let seeded = f
            .store
            .add_photo(
                user.id,
                NewPhoto {
                    url: "https://img.example/seed.jpg".into(),
                    public_id: None,
                },
            )
            .await
            .unwrap();

        f.svc.delete_photo(&lisa(), seeded.id, &live()).await.unwrap();
        assert!(f.host.deleted().is_empty());
    }

    #[tokio::test]
    async fn host_delete_error_leaves_record() {
        let f = fixture().await;
        f.svc.add_photo(&lisa(), upload("a.jpg"), &live()).await.unwrap();
        let b = f.svc.add_photo(&lisa(), upload("b.jpg"), &live()).await.unwrap();
        f.host.fail_deletes(Some("Rate limit exceeded"));

        let err = f.svc.delete_photo(&lisa(), b.id, &live()).await.unwrap_err();
        assert!(matches!(err, DomainError::ExternalService(ref m) if m == "Rate limit exceeded"));
        assert!(reload(&f.store, "lisa").await.photo(b.id).is_some());
    }

    #[tokio::test]
    async fn failed_record_removal_converges_on_retry() {
        let f = fixture().await;
        f.svc.add_photo(&lisa(), upload("a.jpg"), &live()).await.unwrap();
        let b = f.svc.add_photo(&lisa(), upload("b.jpg"), &live()).await.unwrap();

        f.store.set_read_only(true);
        let err = f.svc.delete_photo(&lisa(), b.id, &live()).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to delete photo");

        // host copy is gone, record still points at it
        let kept = reload(&f.store, "lisa").await;
        assert_eq!(kept.photo(b.id).unwrap().public_id, b.public_id);
        assert!(!f.host.stored().contains(b.public_id.as_ref().unwrap()));

        f.store.set_read_only(false);
        f.svc.delete_photo(&lisa(), b.id, &live()).await.unwrap();
        assert!(reload(&f.store, "lisa").await.photo(b.id).is_none());
    }

    #[tokio::test]
    async fn cancelled_operations_change_nothing() {
        let f = fixture().await;
        let a = f.svc.add_photo(&lisa(), upload("a.jpg"), &live()).await.unwrap();
        let b = f.svc.add_photo(&lisa(), upload("b.jpg"), &live()).await.unwrap();
        let cancelled = CancellationToken::new();
        cancelled.cancel();

        let before = reload(&f.store, "lisa").await;
        assert!(matches!(
            f.svc.add_photo(&lisa(), upload("c.jpg"), &cancelled).await,
            Err(DomainError::Cancelled)
        ));
        assert!(matches!(
            f.svc.set_main_photo(&lisa(), b.id, &cancelled).await,
            Err(DomainError::Cancelled)
        ));
        assert!(matches!(
            f.svc.delete_photo(&lisa(), b.id, &cancelled).await,
            Err(DomainError::Cancelled)
        ));

        let after = reload(&f.store, "lisa").await;
        assert_eq!(before.photos, after.photos);
        assert!(after.photo(a.id).unwrap().is_main);
        assert_eq!(f.host.stored().len(), 2);
    }

    #[tokio::test]
    async fn cancel_during_upload_discards_the_image() {
        let f = fixture().await;
        let token = CancellationToken::new();
        f.host.cancel_after_upload(&token);

        let err = f.svc.add_photo(&lisa(), upload("a.jpg"), &token).await.unwrap_err();
        assert!(matches!(err, DomainError::Cancelled));
        assert!(f.host.stored().is_empty());
        assert_eq!(f.host.deleted(), vec!["members/1-a.jpg".to_string()]);
        assert!(reload(&f.store, "lisa").await.photos.is_empty());
    }

    #[tokio::test]
    async fn moderation_requires_role() {
        let f = fixture().await;
        let err = f.svc.photos_for_moderation(&lisa()).await.unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[tokio::test]
    async fn moderator_approves_and_lists() {
        let f = fixture().await;
        let a = f.svc.add_photo(&lisa(), upload("a.jpg"), &live()).await.unwrap();
        f.svc.add_photo(&lisa(), upload("b.jpg"), &live()).await.unwrap();

        assert_eq!(f.svc.photos_for_moderation(&moderator()).await.unwrap().len(), 2);
        f.svc.approve_photo(&moderator(), a.id, &live()).await.unwrap();
        assert_eq!(f.svc.photos_for_moderation(&moderator()).await.unwrap().len(), 1);

        let err = f.svc.approve_photo(&moderator(), 999, &live()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn rejecting_main_promotes_oldest_remaining() {
        let f = fixture().await;
        let a = f.svc.add_photo(&lisa(), upload("a.jpg"), &live()).await.unwrap();
        let b = f.svc.add_photo(&lisa(), upload("b.jpg"), &live()).await.unwrap();
        f.svc.add_photo(&lisa(), upload("c.jpg"), &live()).await.unwrap();

        f.svc.reject_photo(&moderator(), a.id, &live()).await.unwrap();

        let user = reload(&f.store, "lisa").await;
        assert_eq!(user.photos.len(), 2);
        assert_eq!(main_count(&user), 1);
        assert_eq!(user.main_photo().map(|p| p.id), Some(b.id));
    }
}
