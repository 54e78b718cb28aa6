//! PortalService: every portal workflow operation.
//!
//! Takes its collaborators as `Arc<dyn Port>` so the same logic runs against
//! the in-memory store, Postgres, or test doubles. Every operation takes the
//! caller's [`Principal`] explicitly where authorization matters.

use std::sync::Arc;

use uuid::Uuid;

use crate::application::Application;
use crate::blob_store::BlobStore;
use crate::cycle::ApplicationCycle;
use crate::error::{PortalError, Result};
use crate::policy::PortalPolicy;
use crate::ports::PortalStore;
use crate::users::RoleDirectory;

mod accounts;
mod applications;
mod cycles;
mod decisions;
mod faq;
mod reports;
mod reviews;
mod whitelist;

pub struct PortalService {
    store: Arc<dyn PortalStore>,
    blobs: Arc<dyn BlobStore>,
    roles: Arc<dyn RoleDirectory>,
    policy: PortalPolicy,
}

impl PortalService {
    pub fn new(
        store: Arc<dyn PortalStore>,
        blobs: Arc<dyn BlobStore>,
        roles: Arc<dyn RoleDirectory>,
        policy: PortalPolicy,
    ) -> Self {
        Self {
            store,
            blobs,
            roles,
            policy,
        }
    }

    pub fn policy(&self) -> &PortalPolicy {
        &self.policy
    }

    /// The single current cycle.
    pub async fn current_cycle(&self) -> Result<ApplicationCycle> {
        let mut current = self.store.current_cycles().await?;
        match current.len() {
            0 => Err(PortalError::NoCurrentCycle),
            1 => Ok(current.remove(0)),
            n => {
                tracing::error!(count = n, "more than one application cycle is current");
                Err(PortalError::MultipleCurrentCycles(n))
            }
        }
    }

    async fn require_application(&self, id: Uuid) -> Result<Application> {
        self.store
            .get_application(id)
            .await?
            .ok_or_else(|| PortalError::not_found("application", id))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::application::{GrantType, SubmitApplication};
    use crate::blob_store::InMemoryBlobStore;
    use crate::cycle::CycleStage;
    use crate::memory::MemoryStore;
    use crate::principal::{Principal, Role};
    use crate::users::{InMemoryRoleDirectory, ProfileForm, UserProfile};
    use crate::whitelist::NewWhitelistEntry;

    pub fn admin() -> Principal {
        Principal::new("admin-1", "admin@example.org", vec![Role::Admin])
    }

    pub fn applicant(id: &str) -> Principal {
        Principal::new(id, format!("{id}@example.org"), vec![Role::Applicant])
    }

    pub fn reviewer(id: &str) -> Principal {
        Principal::new(id, format!("{id}@example.org"), vec![Role::Reviewer])
    }

    pub fn service_with(policy: PortalPolicy) -> PortalService {
        PortalService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(InMemoryBlobStore::new()),
            Arc::new(InMemoryRoleDirectory::new()),
            policy,
        )
    }

    /// A service with an open "2025" cycle.
    pub async fn service() -> PortalService {
        let svc = service_with(PortalPolicy::default());
        svc.end_cycle_and_start_new(&admin(), "2025").await.unwrap();
        svc
    }

    pub fn submission(grant_type: GrantType) -> SubmitApplication {
        SubmitApplication {
            grant_type,
            title: "Tumour microenvironment study".into(),
            answers: Default::default(),
            file_name: "proposal.pdf".into(),
            // "%PDF-1.4"
            file_base64: "JVBERi0xLjQ=".into(),
        }
    }

    pub async fn submit(svc: &PortalService, who: &str) -> Application {
        svc.submit_application(&applicant(who), submission(GrantType::Research))
            .await
            .unwrap()
    }

    pub async fn move_to(svc: &PortalService, stage: CycleStage) {
        svc.update_cycle_stage(&admin(), stage).await.unwrap();
    }

    /// Whitelist and register a reviewer profile directly.
    pub async fn register_reviewer(svc: &PortalService, id: &str) -> UserProfile {
        let who = reviewer(id);
        svc.add_to_whitelist(
            &admin(),
            NewWhitelistEntry {
                email: who.email.clone(),
                first_name: "Rev".into(),
                last_name: id.into(),
                affiliation: "Institute".into(),
                title: String::new(),
            },
        )
        .await
        .unwrap();
        svc.register_reviewer(
            &who,
            ProfileForm {
                first_name: "Rev".into(),
                last_name: id.into(),
                ..Default::default()
            },
        )
        .await
        .unwrap()
    }
}
