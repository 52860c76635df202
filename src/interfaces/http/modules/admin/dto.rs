//! Admin DTOs

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{PhotoForApproval, User};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserWithRolesDto {
    pub id: i32,
    pub username: String,
    pub roles: Vec<String>,
}

impl From<User> for UserWithRolesDto {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            roles: u.roles.iter().map(|r| r.as_str().to_string()).collect(),
        }
    }
}

/// `?roles=Member,Moderator`
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EditRolesParams {
    /// Comma-separated role names
    #[serde(default)]
    pub roles: String,
}

impl EditRolesParams {
    pub fn role_names(&self) -> Vec<String> {
        self.roles.split(',').map(|r| r.trim().to_string()).collect()
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PhotoForApprovalDto {
    pub id: i32,
    pub url: String,
    pub username: String,
    pub is_approved: bool,
}

impl From<PhotoForApproval> for PhotoForApprovalDto {
    fn from(p: PhotoForApproval) -> Self {
        Self {
            id: p.id,
            url: p.url,
            username: p.username,
            is_approved: p.is_approved,
        }
    }
}
