//! Infrastructure layer - external concerns

pub mod crypto;
pub mod database;
pub mod image_host;
pub mod storage;

pub use database::repositories::SeaOrmRepositoryProvider;
pub use database::{init_database, DatabaseConfig};
pub use image_host::{CloudinaryConfig, CloudinaryImageHost};
pub use storage::InMemoryStore;
