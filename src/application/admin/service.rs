//! Role management service

use std::sync::Arc;

use tracing::info;

use crate::application::require_any_role;
use crate::domain::{DomainError, DomainResult, Identity, RepositoryProvider, Role, User};

pub struct AdminService {
    repos: Arc<dyn RepositoryProvider>,
}

impl AdminService {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    /// Every user with their roles, ordered by username.
    pub async fn users_with_roles(&self, identity: &Identity) -> DomainResult<Vec<User>> {
        require_any_role(identity, &[Role::Admin])?;
        self.repos.users().list_users_with_roles().await
    }

    /// Replace a user's roles with `requested` (names, case-insensitive).
    /// Returns the roles now held.
    pub async fn edit_roles(
        &self,
        identity: &Identity,
        username: &str,
        requested: &[String],
    ) -> DomainResult<Vec<Role>> {
        require_any_role(identity, &[Role::Admin])?;
        let roles = parse_roles(requested)?;

        let username = username.to_lowercase();
        if !self.repos.users().set_roles(&username, &roles).await? {
            return Err(DomainError::user_not_found(&username));
        }

        info!(
            admin = %identity.username,
            username = %username,
            roles = ?roles,
            "Roles updated"
        );
        Ok(roles)
    }
}

/// Parse and de-duplicate role names, keeping the first occurrence order.
fn parse_roles(requested: &[String]) -> DomainResult<Vec<Role>> {
    let mut roles = Vec::new();
    for name in requested.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
        let role =
            Role::parse(name).ok_or_else(|| DomainError::Validation(format!("Unknown role: {}", name)))?;
        if !roles.contains(&role) {
            roles.push(role);
        }
    }

    if roles.is_empty() {
        return Err(DomainError::Validation(
            "You must select at least one role".into(),
        ));
    }
    Ok(roles)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::{NewUser, UserRepository};
    use crate::infrastructure::storage::InMemoryStore;

    async fn setup() -> (AdminService, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        store
            .create_user(NewUser {
                username: "lisa".into(),
                known_as: "Lisa".into(),
                gender: "female".into(),
                date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
                city: "Leeds".into(),
                country: "UK".into(),
                roles: vec![Role::Member],
            })
            .await
            .unwrap();
        (AdminService::new(store.clone()), store)
    }

    fn admin() -> Identity {
        Identity::new("admin", vec![Role::Admin])
    }

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn admin_edits_roles() {
        let (svc, store) = setup().await;
        let roles = svc
            .edit_roles(&admin(), "Lisa", &names(&["member", "Moderator", "member"]))
            .await
            .unwrap();
        assert_eq!(roles, vec![Role::Member, Role::Moderator]);

        let lisa = store.get_user_by_username("lisa").await.unwrap().unwrap();
        assert!(lisa.has_role(Role::Moderator));
    }

    #[tokio::test]
    async fn unknown_role_is_rejected() {
        let (svc, _) = setup().await;
        let err = svc
            .edit_roles(&admin(), "lisa", &names(&["Member", "Wizard"]))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown role: Wizard");
    }

    #[tokio::test]
    async fn empty_role_list_is_rejected() {
        let (svc, _) = setup().await;
        let err = svc.edit_roles(&admin(), "lisa", &names(&[" "])).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn missing_user_is_not_found() {
        let (svc, _) = setup().await;
        let err = svc
            .edit_roles(&admin(), "ghost", &names(&["Member"]))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn members_cannot_manage_roles() {
        let (svc, _) = setup().await;
        let member = Identity::new("lisa", vec![Role::Member]);
        assert!(matches!(
            svc.users_with_roles(&member).await,
            Err(DomainError::Forbidden(_))
        ));
        assert_eq!(svc.users_with_roles(&admin()).await.unwrap().len(), 1);
    }
}
