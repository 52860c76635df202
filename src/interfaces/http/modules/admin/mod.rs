//! Admin module: role management and photo moderation

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
