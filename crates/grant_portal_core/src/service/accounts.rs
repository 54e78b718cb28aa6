use crate::error::{PortalError, Result};
use crate::principal::{normalize_email, Principal, Role};
use crate::users::{ProfileForm, UserProfile};

use super::PortalService;

impl PortalService {
    pub async fn register_applicant(
        &self,
        principal: &Principal,
        form: ProfileForm,
    ) -> Result<UserProfile> {
        self.register(principal, form, Role::Applicant).await
    }

    /// Reviewers self-register only with an active whitelist entry.
    pub async fn register_reviewer(
        &self,
        principal: &Principal,
        form: ProfileForm,
    ) -> Result<UserProfile> {
        if !self.is_email_whitelisted(&principal.email).await? {
            tracing::warn!(email = %principal.normalized_email(), "reviewer registration without whitelist entry");
            return Err(PortalError::Unauthorized(format!(
                "{} is not on the reviewer whitelist",
                principal.normalized_email()
            )));
        }
        self.register(principal, form, Role::Reviewer).await
    }

    pub async fn grant_admin_role(&self, principal: &Principal, email: &str) -> Result<()> {
        principal.require_admin()?;
        let email = normalize_email(email);
        self.roles.assign_role(&email, Role::Admin).await?;
        tracing::info!(%email, by = %principal.user_id, "admin role granted");
        Ok(())
    }

    pub async fn roles_for(&self, email: &str) -> Result<Vec<Role>> {
        self.roles.roles_for(email).await
    }

    async fn register(
        &self,
        principal: &Principal,
        form: ProfileForm,
        role: Role,
    ) -> Result<UserProfile> {
        if form.first_name.trim().is_empty() || form.last_name.trim().is_empty() {
            return Err(PortalError::InvalidInput(
                "first and last name are required".into(),
            ));
        }
        if self.store.get_profile(&principal.user_id, role).await?.is_some() {
            return Err(PortalError::Conflict(format!(
                "{} already has a {role} profile",
                principal.user_id
            )));
        }
        let profile = form.into_profile(principal, role);
        self.store.save_profile(&profile).await?;
        self.roles.assign_role(&profile.email, role).await?;
        tracing::info!(user = %profile.user_id, %role, "account registered");
        Ok(profile)
    }
}
