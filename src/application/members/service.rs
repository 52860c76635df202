//! Member query service

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::application::{ensure_active, load_caller};
use crate::domain::user::default_gender_for;
use crate::domain::{
    DomainError, DomainResult, Identity, Member, MemberQuery, ProfileUpdate, RepositoryProvider,
    UserParams,
};
use crate::shared::PagedList;

pub struct MemberService {
    repos: Arc<dyn RepositoryProvider>,
}

impl MemberService {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    /// Page of members the caller may browse.
    ///
    /// An empty `gender` is replaced by the opposite of the caller's own;
    /// the caller never appears in the result.
    pub async fn get_members(
        &self,
        identity: &Identity,
        params: &UserParams,
        cancel: &CancellationToken,
    ) -> DomainResult<PagedList<Member>> {
        self.get_members_on(identity, params, Utc::now().date_naive(), cancel)
            .await
    }

    pub(crate) async fn get_members_on(
        &self,
        identity: &Identity,
        params: &UserParams,
        today: NaiveDate,
        cancel: &CancellationToken,
    ) -> DomainResult<PagedList<Member>> {
        ensure_active(cancel)?;

        let own_gender = self
            .repos
            .users()
            .get_user_gender(&identity.username)
            .await?
            .ok_or_else(|| DomainError::user_not_found(&identity.username))?;

        let gender = params
            .gender
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| default_gender_for(&own_gender));

        let query = MemberQuery::resolve(params, &identity.username, gender);
        debug!(
            username = %identity.username,
            gender = %query.gender,
            min_age = query.min_age,
            max_age = query.max_age,
            order_by = query.sort_by.as_str(),
            page = query.page.page,
            size = query.page.size,
            "Listing members"
        );

        ensure_active(cancel)?;
        let page = self.repos.users().get_members(&query, today).await?;

        Ok(page.map(|user| Member::project(user, today, false)))
    }

    /// One member by username. Unapproved photos are included only when the
    /// caller is looking at their own profile.
    pub async fn get_member(&self, identity: &Identity, username: &str) -> DomainResult<Member> {
        let user = self
            .repos
            .users()
            .get_user_by_username(&username.to_lowercase())
            .await?
            .ok_or_else(|| DomainError::user_not_found(username))?;

        let is_owner = user.username == identity.username;
        Ok(Member::project(user, Utc::now().date_naive(), is_owner))
    }

    /// Edit the caller's own profile. An update that changes nothing is
    /// reported as a failure, like a save that touched no rows.
    pub async fn update_profile(
        &self,
        identity: &Identity,
        update: &ProfileUpdate,
        cancel: &CancellationToken,
    ) -> DomainResult<()> {
        ensure_active(cancel)?;
        let mut user = load_caller(self.repos.as_ref(), identity).await?;

        if !user.apply_profile_update(update) {
            return Err(DomainError::Persistence("Failed to update user".into()));
        }

        ensure_active(cancel)?;
        match self.repos.users().save_profile(&user).await {
            Ok(true) => {
                info!(username = %user.username, "Profile updated");
                Ok(())
            }
            Ok(false) => Err(DomainError::Persistence("Failed to update user".into())),
            Err(e) => {
                error!(username = %user.username, error = %e, "Profile save failed");
                Err(DomainError::Persistence("Failed to update user".into()))
            }
        }
    }
}
