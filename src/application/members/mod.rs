//! Member browsing and own-profile editing

pub mod service;

pub use service::MemberService;
