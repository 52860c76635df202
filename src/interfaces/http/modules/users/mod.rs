//! Users module: member browsing, own profile and photos

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
