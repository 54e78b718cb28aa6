use chrono::Utc;
use uuid::Uuid;

use crate::application::{
    sort_newest_first, Application, ApplicationDecision, ApplicationFilter, SubmitApplication,
};
use crate::blob_store::{decode_base64_payload, store_upload};
use crate::cycle::CycleStage;
use crate::error::{PortalError, Result};
use crate::principal::{Principal, Role};

use super::PortalService;

pub(super) const PDF_CONTENT_TYPE: &str = "application/pdf";

impl PortalService {
    pub async fn submit_application(
        &self,
        principal: &Principal,
        submission: SubmitApplication,
    ) -> Result<Application> {
        principal.require_role(Role::Applicant)?;
        if submission.title.trim().is_empty() {
            return Err(PortalError::InvalidInput("title is required".into()));
        }

        let cycle = self.current_cycle().await?;
        cycle.require_stage(CycleStage::ApplicationsOpen)?;
        let now = Utc::now();
        if let Some(deadline) = cycle.deadline_for(submission.grant_type) {
            if now > deadline {
                tracing::warn!(
                    grant_type = %submission.grant_type,
                    %deadline,
                    user = %principal.user_id,
                    "late submission rejected"
                );
                return Err(PortalError::DeadlinePassed(format!(
                    "{} applications closed at {}",
                    submission.grant_type,
                    deadline.to_rfc3339()
                )));
            }
        }

        let content = decode_base64_payload(&submission.file_base64)
            .map_err(|e| PortalError::InvalidInput(e.to_string()))?;
        let file = store_upload(
            self.blobs.as_ref(),
            &submission.file_name,
            &content,
            PDF_CONTENT_TYPE,
        )
        .await?;

        let app = Application {
            application_id: Uuid::new_v4(),
            grant_type: submission.grant_type,
            title: submission.title.trim().to_string(),
            creator_id: principal.user_id.clone(),
            creator_email: principal.normalized_email(),
            answers: submission.answers,
            file,
            cycle_name: cycle.name.clone(),
            decision: ApplicationDecision::Pending,
            submitted_at: now,
        };
        self.store.insert_application(&app).await?;
        tracing::info!(
            application_id = %app.application_id,
            grant_type = %app.grant_type,
            cycle = %app.cycle_name,
            "application submitted"
        );
        Ok(app)
    }

    pub async fn list_applications(
        &self,
        principal: &Principal,
        filter: &ApplicationFilter,
    ) -> Result<Vec<Application>> {
        principal.require_admin()?;
        let mut apps = self.store.list_applications(filter).await?;
        sort_newest_first(&mut apps);
        tracing::debug!(count = apps.len(), "listed applications");
        Ok(apps)
    }

    /// The caller's applications in the current cycle.
    pub async fn my_applications(&self, principal: &Principal) -> Result<Vec<Application>> {
        let cycle = self.current_cycle().await?;
        let mut apps = self
            .store
            .applications_by_creator(&principal.user_id, &cycle.name)
            .await?;
        sort_newest_first(&mut apps);
        Ok(apps)
    }

    /// Visible to admins, the owner, and reviewers assigned to it.
    pub async fn get_application(&self, principal: &Principal, id: Uuid) -> Result<Application> {
        let app = self.require_application(id).await?;
        if principal.is_admin() || app.is_owned_by(&principal.user_id) {
            return Ok(app);
        }
        if principal.has_role(Role::Reviewer) {
            let reviews = self.store.reviews_for_application(id).await?;
            if reviews.iter().any(|r| r.reviewer_id == principal.user_id) {
                return Ok(app);
            }
        }
        Err(PortalError::Unauthorized(format!(
            "{} cannot view application {id}",
            principal.user_id
        )))
    }
}
