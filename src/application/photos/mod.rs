//! Photo uploads, main-photo selection, deletion and moderation

pub mod service;

pub use service::PhotoService;
