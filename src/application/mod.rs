//! Application layer: use-case orchestration
//!
//! Services take the caller's [`Identity`] explicitly and a
//! [`CancellationToken`]; a cancelled token stops an operation before its
//! next mutation.

pub mod admin;
pub mod members;
pub mod photos;

pub use admin::AdminService;
pub use members::MemberService;
pub use photos::PhotoService;

use tokio_util::sync::CancellationToken;

use crate::domain::{DomainError, DomainResult, Identity, Role, User};
use crate::domain::repositories::RepositoryProvider;

fn ensure_active(cancel: &CancellationToken) -> DomainResult<()> {
    if cancel.is_cancelled() {
        return Err(DomainError::Cancelled);
    }
    Ok(())
}

fn require_any_role(identity: &Identity, roles: &[Role]) -> DomainResult<()> {
    if identity.has_any_role(roles) {
        Ok(())
    } else {
        Err(DomainError::Forbidden(format!(
            "Requires one of: {}",
            roles.iter().map(Role::as_str).collect::<Vec<_>>().join(", ")
        )))
    }
}

async fn load_caller(repos: &dyn RepositoryProvider, identity: &Identity) -> DomainResult<User> {
    repos
        .users()
        .get_user_by_username(&identity.username)
        .await?
        .ok_or_else(|| DomainError::user_not_found(&identity.username))
}
