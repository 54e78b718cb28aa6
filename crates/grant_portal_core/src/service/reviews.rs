use uuid::Uuid;

use crate::application::ApplicationFilter;
use crate::cycle::CycleStage;
use crate::error::{PortalError, Result};
use crate::principal::{Principal, Role};
use crate::review::{
    sort_recently_updated, AssignmentRow, Review, ReviewDraft, ReviewSummary, ReviewerAssignment,
};

use super::PortalService;

impl PortalService {
    // ── Assignment ──

    pub async fn assign_reviewers(
        &self,
        principal: &Principal,
        application_id: Uuid,
        assignment: ReviewerAssignment,
    ) -> Result<Vec<Review>> {
        principal.require_admin()?;
        let created = self
            .store
            .assign_reviewers(application_id, &assignment, self.policy.allow_dual_role)
            .await
            .inspect_err(|e| {
                tracing::warn!(%application_id, error = %e, "reviewer assignment rejected")
            })?;
        for review in &created {
            tracing::info!(
                %application_id,
                review_id = %review.review_id,
                reviewer = %review.reviewer_id,
                role = %review.reviewer_role,
                "reviewer assigned"
            );
        }
        Ok(created)
    }

    /// Only reviews nobody has started can be withdrawn.
    pub async fn unassign_reviewer(
        &self,
        principal: &Principal,
        application_id: Uuid,
        review_id: Uuid,
    ) -> Result<Review> {
        principal.require_admin()?;
        let removed = self
            .store
            .remove_unstarted_review(application_id, review_id)
            .await?;
        tracing::info!(
            %application_id,
            %review_id,
            reviewer = %removed.reviewer_id,
            "reviewer unassigned"
        );
        Ok(removed)
    }

    /// Every current-cycle application with its reviewers and aggregate status.
    pub async fn assignment_board(&self, principal: &Principal) -> Result<Vec<AssignmentRow>> {
        principal.require_admin()?;
        let cycle = self.current_cycle().await?;
        let mut apps = self
            .store
            .list_applications(&ApplicationFilter::for_cycle(&cycle.name))
            .await?;
        crate::application::sort_newest_first(&mut apps);

        let mut rows = Vec::with_capacity(apps.len());
        for app in &apps {
            let reviews = self.store.reviews_for_application(app.application_id).await?;
            rows.push(AssignmentRow::new(app, &reviews));
        }
        Ok(rows)
    }

    // ── Lifecycle ──

    async fn own_review(
        &self,
        principal: &Principal,
        application_id: Uuid,
        review_id: Uuid,
    ) -> Result<Review> {
        principal.require_role(Role::Reviewer)?;
        let review = self
            .store
            .get_review(application_id, review_id)
            .await?
            .ok_or_else(|| PortalError::not_found("review", review_id))?;
        if review.reviewer_id != principal.user_id {
            return Err(PortalError::Unauthorized(format!(
                "review {review_id} is assigned to another reviewer"
            )));
        }
        self.current_cycle()
            .await?
            .require_stage(CycleStage::Review)?;
        Ok(review)
    }

    pub async fn save_review_progress(
        &self,
        principal: &Principal,
        application_id: Uuid,
        review_id: Uuid,
        draft: ReviewDraft,
    ) -> Result<Review> {
        let mut review = self.own_review(principal, application_id, review_id).await?;
        let score = draft.score()?;
        let loaded = review.status;
        review.save_progress(draft.feedback, score)?;
        self.store.save_review(&review, loaded).await?;
        tracing::debug!(%review_id, "review progress saved");
        Ok(review)
    }

    pub async fn submit_review(
        &self,
        principal: &Principal,
        application_id: Uuid,
        review_id: Uuid,
        draft: ReviewDraft,
    ) -> Result<Review> {
        let mut review = self.own_review(principal, application_id, review_id).await?;
        let score = draft.required_score()?;
        let loaded = review.status;
        if review.submit(score, draft.feedback)? {
            self.store.save_review(&review, loaded).await?;
            tracing::info!(
                %application_id,
                %review_id,
                score = score.value(),
                "review submitted"
            );
        }
        Ok(review)
    }

    // ── Queries ──

    /// The caller's reviews, most recently updated first.
    pub async fn reviews_for_reviewer(&self, principal: &Principal) -> Result<Vec<Review>> {
        principal.require_role(Role::Reviewer)?;
        let mut reviews = self.store.reviews_for_reviewer(&principal.user_id).await?;
        sort_recently_updated(&mut reviews);
        Ok(reviews)
    }

    pub async fn review_summary(
        &self,
        principal: &Principal,
        application_id: Uuid,
    ) -> Result<ReviewSummary> {
        self.require_application(application_id).await?;
        let reviews = self.store.reviews_for_application(application_id).await?;
        let assigned = reviews.iter().any(|r| r.reviewer_id == principal.user_id);
        if !principal.is_admin() && !assigned {
            return Err(PortalError::Unauthorized(format!(
                "{} cannot view reviews of application {application_id}",
                principal.user_id
            )));
        }
        Ok(ReviewSummary::from_reviews(application_id, &reviews))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::policy::PortalPolicy;
    use crate::review::{ReviewFeedback, ReviewStatus, ReviewerRole};

    struct Fixture {
        svc: PortalService,
        app_id: Uuid,
        primary: Review,
        secondary: Review,
    }

    async fn fixture(policy: PortalPolicy) -> Fixture {
        let svc = service_with(policy);
        svc.end_cycle_and_start_new(&admin(), "2025").await.unwrap();
        let app = submit(&svc, "a1").await;
        register_reviewer(&svc, "r1").await;
        register_reviewer(&svc, "r2").await;
        let created = svc
            .assign_reviewers(
                &admin(),
                app.application_id,
                ReviewerAssignment {
                    primary: Some("r1".into()),
                    secondary: Some("r2".into()),
                },
            )
            .await
            .unwrap();
        let pick = |role: ReviewerRole| {
            created
                .iter()
                .find(|r| r.reviewer_role == role)
                .cloned()
                .unwrap()
        };
        Fixture {
            app_id: app.application_id,
            primary: pick(ReviewerRole::Primary),
            secondary: pick(ReviewerRole::Secondary),
            svc,
        }
    }

    fn draft(score: Option<u8>) -> ReviewDraft {
        ReviewDraft {
            score,
            feedback: ReviewFeedback {
                significance: "high".into(),
                summary: "strong team".into(),
                internal: "check budget".into(),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn review_writes_require_review_stage() {
        let f = fixture(PortalPolicy::default()).await;
        let err = f
            .svc
            .save_review_progress(&reviewer("r1"), f.app_id, f.primary.review_id, draft(None))
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::StageClosed { .. }));
    }

    #[tokio::test]
    async fn lifecycle_through_to_completed() {
        let f = fixture(PortalPolicy::default()).await;
        move_to(&f.svc, CycleStage::Review).await;

        let saved = f
            .svc
            .save_review_progress(&reviewer("r1"), f.app_id, f.primary.review_id, draft(None))
            .await
            .unwrap();
        assert_eq!(saved.status, ReviewStatus::InProgress);

        let summary = f.svc.review_summary(&admin(), f.app_id).await.unwrap();
        assert_eq!(summary.status, ReviewStatus::InProgress);

        let missing = f
            .svc
            .submit_review(&reviewer("r1"), f.app_id, f.primary.review_id, draft(None))
            .await
            .unwrap_err();
        assert!(matches!(missing, PortalError::InvalidInput(_)));

        let out_of_range = f
            .svc
            .submit_review(&reviewer("r1"), f.app_id, f.primary.review_id, draft(Some(7)))
            .await
            .unwrap_err();
        assert!(matches!(out_of_range, PortalError::InvalidInput(_)));

        for (who, review) in [("r1", &f.primary), ("r2", &f.secondary)] {
            let done = f
                .svc
                .submit_review(&reviewer(who), f.app_id, review.review_id, draft(Some(2)))
                .await
                .unwrap();
            assert_eq!(done.status, ReviewStatus::Completed);
        }
        let summary = f.svc.review_summary(&admin(), f.app_id).await.unwrap();
        assert_eq!(summary.status, ReviewStatus::Completed);

        // identical re-submission is accepted, a changed one is not
        f.svc
            .submit_review(&reviewer("r1"), f.app_id, f.primary.review_id, draft(Some(2)))
            .await
            .unwrap();
        let err = f
            .svc
            .submit_review(&reviewer("r1"), f.app_id, f.primary.review_id, draft(Some(3)))
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn only_the_assigned_reviewer_writes() {
        let f = fixture(PortalPolicy::default()).await;
        move_to(&f.svc, CycleStage::Review).await;
        let err = f
            .svc
            .submit_review(&reviewer("r2"), f.app_id, f.primary.review_id, draft(Some(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn dual_role_depends_on_policy() {
        let svc = service().await;
        let app = submit(&svc, "a1").await;
        register_reviewer(&svc, "r1").await;
        let both = ReviewerAssignment {
            primary: Some("r1".into()),
            secondary: Some("r1".into()),
        };
        let err = svc
            .assign_reviewers(&admin(), app.application_id, both.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::Conflict(_)));

        let lenient = service_with(PortalPolicy {
            allow_dual_role: true,
            ..Default::default()
        });
        lenient
            .end_cycle_and_start_new(&admin(), "2025")
            .await
            .unwrap();
        let app = submit(&lenient, "a1").await;
        register_reviewer(&lenient, "r1").await;
        let created = lenient
            .assign_reviewers(&admin(), app.application_id, both)
            .await
            .unwrap();
        assert_eq!(created.len(), 2);
    }

    #[tokio::test]
    async fn board_and_reviewer_queue() {
        let f = fixture(PortalPolicy::default()).await;
        let board = f.svc.assignment_board(&admin()).await.unwrap();
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].primary_reviewer.as_deref(), Some("r1"));
        assert_eq!(board[0].secondary_reviewer.as_deref(), Some("r2"));
        assert_eq!(board[0].review_status, ReviewStatus::InProgress);

        let mine = f.svc.reviews_for_reviewer(&reviewer("r2")).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].review_id, f.secondary.review_id);

        // assigned reviewers can open the application and its review summary
        assert!(f.svc.get_application(&reviewer("r2"), f.app_id).await.is_ok());
        assert!(f.svc.review_summary(&reviewer("r2"), f.app_id).await.is_ok());
        assert!(f.svc.review_summary(&reviewer("r9"), f.app_id).await.is_err());
    }

    #[tokio::test]
    async fn unassign_only_before_start() {
        let f = fixture(PortalPolicy::default()).await;
        move_to(&f.svc, CycleStage::Review).await;
        f.svc
            .save_review_progress(&reviewer("r2"), f.app_id, f.secondary.review_id, draft(None))
            .await
            .unwrap();

        f.svc
            .unassign_reviewer(&admin(), f.app_id, f.primary.review_id)
            .await
            .unwrap();
        let err = f
            .svc
            .unassign_reviewer(&admin(), f.app_id, f.secondary.review_id)
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::Conflict(_)));

        // the freed primary slot can be filled again
        register_reviewer(&f.svc, "r3").await;
        f.svc
            .assign_reviewers(
                &admin(),
                f.app_id,
                ReviewerAssignment {
                    primary: Some("r3".into()),
                    secondary: None,
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn stale_review_copy_cannot_overwrite_submission() {
        let f = fixture(PortalPolicy::default()).await;
        move_to(&f.svc, CycleStage::Review).await;
        let mut stale = f
            .svc
            .store
            .get_review(f.app_id, f.primary.review_id)
            .await
            .unwrap()
            .unwrap();

        f.svc
            .submit_review(&reviewer("r1"), f.app_id, f.primary.review_id, draft(Some(2)))
            .await
            .unwrap();

        let loaded = stale.status;
        stale.save_progress(draft(None).feedback, None).unwrap();
        let err = f.svc.store.save_review(&stale, loaded).await.unwrap_err();
        assert!(matches!(err, PortalError::Conflict(_)));

        let stored = f
            .svc
            .store
            .get_review(f.app_id, f.primary.review_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, ReviewStatus::Completed);
        assert_eq!(stored.score.map(|s| s.value()), Some(2));
    }

    #[tokio::test]
    async fn concurrent_submissions_keep_one_result() {
        let f = fixture(PortalPolicy::default()).await;
        move_to(&f.svc, CycleStage::Review).await;
        let who = reviewer("r1");
        let (first, second) = tokio::join!(
            f.svc
                .submit_review(&who, f.app_id, f.primary.review_id, draft(Some(2))),
            f.svc
                .submit_review(&who, f.app_id, f.primary.review_id, draft(Some(4))),
        );

        let winner = match (first, second) {
            (Ok(review), Err(e)) | (Err(e), Ok(review)) => {
                assert!(
                    matches!(
                        e,
                        PortalError::Conflict(_) | PortalError::InvalidTransition { .. }
                    ),
                    "{e}"
                );
                review
            }
            (a, b) => panic!("expected exactly one submission to land: {a:?} / {b:?}"),
        };

        let stored = f
            .svc
            .store
            .get_review(f.app_id, f.primary.review_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, ReviewStatus::Completed);
        assert_eq!(stored.score, winner.score);
        assert_eq!(stored.submitted_at, winner.submitted_at);
    }
}
