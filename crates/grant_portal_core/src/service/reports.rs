use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::application::{Application, ApplicationDecision, ApplicationFilter};
use crate::blob_store::{decode_base64_payload, store_upload};
use crate::error::{PortalError, Result};
use crate::principal::Principal;
use crate::report::{
    derive_report_status, PostGrantReport, ReportFilter, ReportStatus, ReportTrackingRow,
    SubmitReport,
};

use super::applications::PDF_CONTENT_TYPE;
use super::PortalService;

impl PortalService {
    pub async fn submit_post_grant_report(
        &self,
        principal: &Principal,
        application_id: Uuid,
        submission: SubmitReport,
    ) -> Result<PostGrantReport> {
        let app = self.require_application(application_id).await?;
        if !app.is_owned_by(&principal.user_id) {
            return Err(PortalError::Unauthorized(format!(
                "{} does not own application {application_id}",
                principal.user_id
            )));
        }
        let accepted = self
            .store
            .get_decision(application_id)
            .await?
            .is_some_and(|d| d.is_accepted);
        if !accepted {
            return Err(PortalError::Conflict(format!(
                "application {application_id} was not funded; no report is required"
            )));
        }
        if self.store.report_for_application(application_id).await?.is_some() {
            return Err(PortalError::Conflict(format!(
                "a post-grant report already exists for application {application_id}"
            )));
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

        let report = PostGrantReport {
            report_id: Uuid::new_v4(),
            application_id,
            user_id: principal.user_id.clone(),
            file,
            investigator_name: submission.investigator_name.trim().to_string(),
            institution_name: submission.institution_name.trim().to_string(),
            attestation_date: submission.attestation_date,
            submitted_at: Utc::now(),
        };
        self.store.insert_report_if_absent(&report).await?;
        tracing::info!(
            %application_id,
            report_id = %report.report_id,
            "post-grant report submitted"
        );
        Ok(report)
    }

    pub async fn report_for_application(
        &self,
        principal: &Principal,
        application_id: Uuid,
    ) -> Result<Option<PostGrantReport>> {
        let app = self.require_application(application_id).await?;
        self.require_owner_or_admin(principal, &app)?;
        self.store.report_for_application(application_id).await
    }

    pub async fn report_status(
        &self,
        principal: &Principal,
        application_id: Uuid,
    ) -> Result<ReportStatus> {
        let app = self.require_application(application_id).await?;
        self.require_owner_or_admin(principal, &app)?;
        let has_report = self
            .store
            .report_for_application(application_id)
            .await?
            .is_some();
        let deadline = self.report_deadline(&app.cycle_name).await?;
        Ok(derive_report_status(
            has_report,
            app.decision == ApplicationDecision::Accepted,
            deadline,
            Utc::now(),
        ))
    }

    /// Report status of every accepted application in a cycle (the current
    /// one unless the filter names another).
    pub async fn report_tracking(
        &self,
        principal: &Principal,
        filter: &ReportFilter,
    ) -> Result<Vec<ReportTrackingRow>> {
        principal.require_admin()?;
        let cycle_name = match &filter.cycle_name {
            Some(name) => name.clone(),
            None => self.current_cycle().await?.name,
        };
        let deadline = self.report_deadline(&cycle_name).await?;
        let mut apps = self
            .store
            .list_applications(&ApplicationFilter {
                cycle_name: Some(cycle_name),
                decision: Some(ApplicationDecision::Accepted),
                grant_type: filter.grant_type,
            })
            .await?;
        crate::application::sort_newest_first(&mut apps);

        let now = Utc::now();
        let mut rows = Vec::with_capacity(apps.len());
        for app in &apps {
            let report = self.store.report_for_application(app.application_id).await?;
            let row = ReportTrackingRow::new(app, report.as_ref(), deadline, now);
            if filter.matches(&row) {
                rows.push(row);
            }
        }
        tracing::debug!(count = rows.len(), "report tracking rows");
        Ok(rows)
    }

    async fn report_deadline(&self, cycle_name: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .store
            .list_cycles()
            .await?
            .into_iter()
            .find(|c| c.name == cycle_name)
            .and_then(|c| c.deadlines.post_grant_report))
    }

    fn require_owner_or_admin(&self, principal: &Principal, app: &Application) -> Result<()> {
        if principal.is_admin() || app.is_owned_by(&principal.user_id) {
            Ok(())
        } else {
            Err(PortalError::Unauthorized(format!(
                "{} cannot access application {}",
                principal.user_id, app.application_id
            )))
        }
    }
}
