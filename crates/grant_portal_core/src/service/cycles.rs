use crate::cycle::{ApplicationCycle, CycleEdit, CycleStage, DeadlineUpdate};
use crate::error::{PortalError, Result};
use crate::principal::Principal;

use super::PortalService;

impl PortalService {
    /// All cycles, newest first.
    pub async fn list_cycles(&self) -> Result<Vec<ApplicationCycle>> {
        let mut cycles = self.store.list_cycles().await?;
        cycles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(cycles)
    }

    pub async fn update_cycle_stage(
        &self,
        principal: &Principal,
        stage: CycleStage,
    ) -> Result<ApplicationCycle> {
        principal.require_admin()?;
        let current = self.current_cycle().await?;
        let edit = CycleEdit::Stage {
            to: stage,
            by: Some(principal.user_id.clone()),
            policy: self.policy.stage_policy,
        };
        let (cycle, changed) = self
            .store
            .update_current_cycle(current.cycle_id, &edit)
            .await
            .inspect_err(|e| {
                tracing::warn!(cycle = %current.name, error = %e, "stage change rejected")
            })?;
        if changed {
            tracing::info!(
                cycle = %cycle.name,
                to = %stage,
                by = %principal.user_id,
                "cycle stage changed"
            );
        }
        Ok(cycle)
    }

    pub async fn set_cycle_deadlines(
        &self,
        principal: &Principal,
        update: DeadlineUpdate,
    ) -> Result<ApplicationCycle> {
        principal.require_admin()?;
        if update.is_empty() {
            return Err(PortalError::InvalidInput("no deadlines provided".into()));
        }
        let current = self.current_cycle().await?;
        let (cycle, _) = self
            .store
            .update_current_cycle(current.cycle_id, &CycleEdit::Deadlines(update))
            .await?;
        tracing::info!(cycle = %cycle.name, "cycle deadlines updated");
        Ok(cycle)
    }

    /// Close every current cycle and open `name` as the new current one.
    pub async fn end_cycle_and_start_new(
        &self,
        principal: &Principal,
        name: &str,
    ) -> Result<ApplicationCycle> {
        principal.require_admin()?;
        let name = name.trim();
        if name.is_empty() {
            return Err(PortalError::InvalidInput("cycle name is required".into()));
        }
        let next = ApplicationCycle::new(name);
        self.store.rotate_cycle(&next).await?;
        tracing::info!(cycle = %next.name, by = %principal.user_id, "started new application cycle");
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::super::testing::*;
    use crate::cycle::end_of_day;
    use crate::policy::{PortalPolicy, StagePolicy};

    use super::*;

    #[tokio::test]
    async fn stage_moves_forward_and_records_actor() {
        let svc = service().await;
        let cycle = svc
            .update_cycle_stage(&admin(), CycleStage::Review)
            .await
            .unwrap();
        assert_eq!(cycle.stage, CycleStage::Review);
        assert_eq!(cycle.history.len(), 1);
        assert_eq!(cycle.history[0].transitioned_by.as_deref(), Some("admin-1"));

        let err = svc
            .update_cycle_stage(&admin(), CycleStage::ApplicationsOpen)
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::InvalidTransition { .. }));
        assert_eq!(svc.current_cycle().await.unwrap().stage, CycleStage::Review);
    }

    #[tokio::test]
    async fn unordered_policy_allows_going_back() {
        let svc = service_with(PortalPolicy {
            stage_policy: StagePolicy::Unordered,
            allow_dual_role: false,
        });
        svc.end_cycle_and_start_new(&admin(), "2025").await.unwrap();
        svc.update_cycle_stage(&admin(), CycleStage::Grading)
            .await
            .unwrap();
        let cycle = svc
            .update_cycle_stage(&admin(), CycleStage::ApplicationsOpen)
            .await
            .unwrap();
        assert_eq!(cycle.stage, CycleStage::ApplicationsOpen);
    }

    #[tokio::test]
    async fn only_admins_manage_cycles() {
        let svc = service().await;
        let err = svc
            .update_cycle_stage(&applicant("a1"), CycleStage::Review)
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::Unauthorized(_)));
        assert!(svc
            .end_cycle_and_start_new(&reviewer("r1"), "2026")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn rollover_keeps_single_current_cycle() {
        let svc = service().await;
        svc.end_cycle_and_start_new(&admin(), "2026").await.unwrap();
        let current = svc.current_cycle().await.unwrap();
        assert_eq!(current.name, "2026");
        assert_eq!(current.stage, CycleStage::ApplicationsOpen);

        let cycles = svc.list_cycles().await.unwrap();
        assert_eq!(cycles.len(), 2);
        assert_eq!(cycles.iter().filter(|c| c.current).count(), 1);
        let old = cycles.iter().find(|c| c.name == "2025").unwrap();
        assert!(old.end_date.is_some());

        let dup = svc
            .end_cycle_and_start_new(&admin(), " 2025 ")
            .await
            .unwrap_err();
        assert!(matches!(dup, PortalError::Conflict(_)));
    }

    #[tokio::test]
    async fn deadlines_only_touch_provided_fields() {
        let svc = service().await;
        let day = NaiveDate::from_ymd_opt(2026, 4, 30).unwrap();
        let cycle = svc
            .set_cycle_deadlines(
                &admin(),
                DeadlineUpdate {
                    post_grant_report: Some(day),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cycle.deadlines.post_grant_report, Some(end_of_day(day)));
        assert!(cycle.deadlines.research.is_none());

        let err = svc
            .set_cycle_deadlines(&admin(), DeadlineUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn stage_change_after_rollover_is_rejected() {
        let svc = service().await;
        let stale = svc.current_cycle().await.unwrap();
        svc.end_cycle_and_start_new(&admin(), "2026").await.unwrap();

        let edit = CycleEdit::Stage {
            to: CycleStage::Review,
            by: Some("admin-1".into()),
            policy: StagePolicy::ForwardOnly,
        };
        let err = svc
            .store
            .update_current_cycle(stale.cycle_id, &edit)
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::Conflict(_)));

        let current = svc.current_cycle().await.unwrap();
        assert_eq!(current.name, "2026");
        assert_eq!(current.stage, CycleStage::ApplicationsOpen);
    }

    #[tokio::test]
    async fn concurrent_cycle_writes_keep_one_current_cycle() {
        let svc = service().await;
        let admin = admin();
        let day = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        let (stage, deadlines, rollover) = tokio::join!(
            svc.update_cycle_stage(&admin, CycleStage::Review),
            svc.set_cycle_deadlines(
                &admin,
                DeadlineUpdate {
                    reviewer: Some(day),
                    ..Default::default()
                },
            ),
            svc.end_cycle_and_start_new(&admin, "2026"),
        );
        rollover.unwrap();
        for outcome in [stage.map(|_| ()), deadlines.map(|_| ())] {
            if let Err(e) = outcome {
                assert!(matches!(e, PortalError::Conflict(_)), "{e}");
            }
        }

        let cycles = svc.list_cycles().await.unwrap();
        assert_eq!(cycles.iter().filter(|c| c.current).count(), 1);
        assert_eq!(svc.current_cycle().await.unwrap().name, "2026");
    }

    #[tokio::test]
    async fn stage_and_deadline_changes_both_persist() {
        let svc = service().await;
        let day = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        let actor = admin();
        let (stage, deadlines) = tokio::join!(
            svc.update_cycle_stage(&actor, CycleStage::Review),
            svc.set_cycle_deadlines(
                &actor,
                DeadlineUpdate {
                    reviewer: Some(day),
                    ..Default::default()
                },
            ),
        );
        stage.unwrap();
        deadlines.unwrap();

        let current = svc.current_cycle().await.unwrap();
        assert_eq!(current.stage, CycleStage::Review);
        assert_eq!(current.deadlines.reviewer, Some(end_of_day(day)));
    }
}
