use uuid::Uuid;

use crate::error::{PortalError, Result};
use crate::principal::Principal;
use crate::whitelist::{unique_affiliations, NewWhitelistEntry, WhitelistEntry, WhitelistStatus};

use super::PortalService;

impl PortalService {
    pub async fn add_to_whitelist(
        &self,
        principal: &Principal,
        entry: NewWhitelistEntry,
    ) -> Result<WhitelistEntry> {
        principal.require_admin()?;
        let entry = entry.into_entry(principal.user_id.clone());
        if entry.email.is_empty() || !entry.email.contains('@') {
            return Err(PortalError::InvalidInput(format!(
                "'{}' is not an email address",
                entry.email
            )));
        }
        self.store.insert_whitelist_entry(&entry).await?;
        tracing::info!(email = %entry.email, by = %principal.user_id, "reviewer whitelisted");
        Ok(entry)
    }

    /// Newest entries first.
    pub async fn list_whitelist(&self, principal: &Principal) -> Result<Vec<WhitelistEntry>> {
        principal.require_admin()?;
        let mut entries = self.store.list_whitelist().await?;
        entries.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        Ok(entries)
    }

    pub async fn set_whitelist_status(
        &self,
        principal: &Principal,
        entry_id: Uuid,
        status: WhitelistStatus,
    ) -> Result<WhitelistEntry> {
        principal.require_admin()?;
        let entry = self.store.set_whitelist_status(entry_id, status).await?;
        tracing::info!(email = %entry.email, ?status, "whitelist status changed");
        Ok(entry)
    }

    pub async fn remove_from_whitelist(&self, principal: &Principal, entry_id: Uuid) -> Result<()> {
        principal.require_admin()?;
        self.store.delete_whitelist_entry(entry_id).await?;
        tracing::info!(%entry_id, "whitelist entry removed");
        Ok(())
    }

    /// True only for an active entry.
    pub async fn is_email_whitelisted(&self, email: &str) -> Result<bool> {
        Ok(self
            .store
            .find_whitelist_by_email(email)
            .await?
            .is_some_and(|e| e.is_active()))
    }

    pub async fn whitelist_affiliations(&self) -> Result<Vec<String>> {
        let entries = self.store.list_whitelist().await?;
        Ok(unique_affiliations(&entries))
    }
}
