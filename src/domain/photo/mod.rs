//! Photo aggregate member
//!
//! Photos are owned by a [`User`](crate::domain::User); they are created and
//! destroyed only through the photo service.

pub mod model;
pub mod repository;

pub use model::{MainPhotoSwap, NewPhoto, Photo, PhotoForApproval, PhotoRemoval};
pub use repository::PhotoRepository;
