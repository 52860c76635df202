//! User aggregate
//!
//! Contains the User entity, its member projection, listing parameters,
//! roles and the repository interface.

pub mod member;
pub mod model;
pub mod params;
pub mod repository;
pub mod role;

pub use member::Member;
pub use model::{age_on, NewUser, ProfileUpdate, User};
pub use params::{default_gender_for, BirthDateRange, MemberQuery, SortBy, UserParams};
pub use repository::UserRepository;
pub use role::Role;
