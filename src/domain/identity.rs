//! Resolved caller identity
//!
//! Produced once per request from the bearer token and passed explicitly
//! into every service call.

use super::user::Role;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Canonical lookup key for the caller's user record.
    pub username: String,
    pub roles: Vec<Role>,
}

impl Identity {
    pub fn new(username: impl Into<String>, roles: Vec<Role>) -> Self {
        Self {
            username: username.into(),
            roles,
        }
    }

    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        self.roles.iter().any(|r| roles.contains(r))
    }
}
