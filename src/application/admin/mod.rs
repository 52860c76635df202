//! Role management

pub mod service;

pub use service::AdminService;
