//! Photo repository interface

use async_trait::async_trait;

use super::model::{MainPhotoSwap, NewPhoto, Photo, PhotoForApproval, PhotoRemoval};
use crate::domain::DomainResult;

/// Every method is one unit of work: either all of its row changes are
/// committed or none are.
#[async_trait]
pub trait PhotoRepository: Send + Sync {
    /// Append a photo to the user's collection. The photo is made main iff
    /// the user owns no photos at commit time.
    async fn add_photo(&self, user_id: i32, photo: NewPhoto) -> DomainResult<Photo>;

    /// Clear `swap.previous` and set `swap.next` as main in one transaction.
    /// Returns `false` when nothing was changed.
    async fn swap_main_photo(&self, user_id: i32, swap: MainPhotoSwap) -> DomainResult<bool>;

    /// Remove a photo record. If the removed photo was main, the owner's
    /// oldest remaining photo is promoted in the same transaction.
    async fn remove_photo(&self, photo_id: i32) -> DomainResult<PhotoRemoval>;

    /// Lookup regardless of approval state.
    async fn get_photo_by_id(&self, photo_id: i32) -> DomainResult<Option<Photo>>;

    async fn get_unapproved_photos(&self) -> DomainResult<Vec<PhotoForApproval>>;

    /// Returns `false` when the photo does not exist.
    async fn approve_photo(&self, photo_id: i32) -> DomainResult<bool>;
}
