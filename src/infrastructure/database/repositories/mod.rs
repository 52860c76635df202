//! Database repository implementations
//!
//! Per-aggregate SeaORM repositories + unified RepositoryProvider.

pub mod photo_repository;
pub mod repository_provider;
pub mod user_repository;

pub use photo_repository::SeaOrmPhotoRepository;
pub use repository_provider::SeaOrmRepositoryProvider;
pub use user_repository::SeaOrmUserRepository;

use crate::domain::DomainError;
use crate::shared::InfraError;

fn db_err(e: sea_orm::DbErr) -> DomainError {
    InfraError::Database(e).into()
}
