use std::collections::HashMap;

use uuid::Uuid;

use crate::cycle::CycleStage;
use crate::decision::{ApplicantResult, Decision, FundingAmount, FundingDecisionRequest};
use crate::error::Result;
use crate::principal::{Principal, Role};
use crate::review::ReviewStatus;

use super::PortalService;

impl PortalService {
    /// Record the award. A positive amount accepts the application, zero
    /// rejects it.
    pub async fn record_funding_decision(
        &self,
        principal: &Principal,
        application_id: Uuid,
        request: FundingDecisionRequest,
    ) -> Result<Decision> {
        principal.require_admin()?;
        let amount = FundingAmount::new(request.funding_amount)?;
        let decision = self
            .store
            .finalize_decision(application_id, amount, request.comments)
            .await?;
        tracing::info!(
            %application_id,
            amount = %decision.funding_amount,
            accepted = decision.is_accepted,
            "funding decision recorded"
        );
        Ok(decision)
    }

    pub async fn update_decision_comments(
        &self,
        principal: &Principal,
        application_id: Uuid,
        comments: &str,
    ) -> Result<Decision> {
        principal.require_admin()?;
        let decision = self
            .store
            .update_decision_comments(application_id, comments)
            .await?;
        tracing::info!(%application_id, "decision comments updated");
        Ok(decision)
    }

    pub async fn get_decision(
        &self,
        principal: &Principal,
        application_id: Uuid,
    ) -> Result<Option<Decision>> {
        principal.require_admin()?;
        self.store.get_decision(application_id).await
    }

    pub async fn decisions_for(
        &self,
        principal: &Principal,
        application_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Decision>> {
        principal.require_admin()?;
        self.store.decisions_for(application_ids).await
    }

    /// Outcomes of the caller's current-cycle applications, once the cycle
    /// reaches Final Decisions.
    pub async fn applicant_results(&self, principal: &Principal) -> Result<Vec<ApplicantResult>> {
        principal.require_role(Role::Applicant)?;
        let cycle = self.current_cycle().await?;
        cycle.require_stage(CycleStage::FinalDecisions)?;

        let apps = self.my_applications(principal).await?;
        let ids: Vec<Uuid> = apps.iter().map(|a| a.application_id).collect();
        let decisions = self.store.decisions_for(&ids).await?;

        let mut results = Vec::with_capacity(apps.len());
        for app in apps {
            let decision = decisions.get(&app.application_id);
            let feedback = self
                .store
                .reviews_for_application(app.application_id)
                .await?
                .into_iter()
                .filter(|r| r.status == ReviewStatus::Completed)
                .map(|r| r.feedback.for_applicant())
                .collect();
            results.push(ApplicantResult {
                application_id: app.application_id,
                title: app.title,
                grant_type: app.grant_type,
                decision: app.decision,
                funding_amount: decision.map(|d| d.funding_amount),
                comments: decision.map(|d| d.comments.clone()),
                feedback,
            });
        }
        Ok(results)
    }
}
