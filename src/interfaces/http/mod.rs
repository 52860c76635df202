//! HTTP REST API interfaces
//!
//! - `common`: response envelopes, error mapping and the validating extractor
//! - `middleware`: JWT authentication
//! - `modules`: handlers and DTOs per resource
//! - `router`: API router with Swagger documentation

pub mod common;
pub mod middleware;
pub mod modules;
pub mod router;

pub use router::{create_api_router, ApiContext, ApiDoc};
