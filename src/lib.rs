//! # Members API
//!
//! Member browsing and photo management backend for a dating site.
//!
//! ## Architecture
//!
//! The project follows Clean Architecture principles:
//!
//! - **domain**: Users, members, photos, roles and the repository ports
//! - **application**: Member queries, photo invariants and role management
//! - **infrastructure**: SeaORM storage, Cloudinary image host, JWT
//! - **interfaces**: REST API with Swagger documentation
//! - **shared**: Errors, pagination and shutdown signalling
//! - **server**: Runtime bootstrap shared by the binaries

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use config::{default_config_path, AppConfig};

// Re-export database types for easy access
pub use infrastructure::{init_database, DatabaseConfig, SeaOrmRepositoryProvider};

// Re-export API router
pub use interfaces::http::create_api_router;
