pub mod identity;
pub mod photo;
pub mod ports;
pub mod repositories;
pub mod user;

// Re-export commonly used types
pub use identity::Identity;
pub use photo::{MainPhotoSwap, NewPhoto, Photo, PhotoForApproval, PhotoRemoval, PhotoRepository};
pub use ports::{ImageStorage, ImageUpload, UploadedImage};
pub use repositories::{DomainResult, RepositoryProvider};
pub use user::{
    Member, MemberQuery, NewUser, ProfileUpdate, Role, SortBy, User, UserParams, UserRepository,
};

pub use crate::shared::errors::DomainError;
