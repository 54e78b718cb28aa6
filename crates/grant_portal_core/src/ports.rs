//! Document store port
//!
//! One trait for every collection the portal touches. Operations that write
//! more than one document, or check a precondition before writing, are single
//! methods here so each adapter can run them atomically.

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::application::{Application, ApplicationFilter};
use crate::cycle::{ApplicationCycle, CycleEdit};
use crate::decision::{Decision, FundingAmount};
use crate::error::Result;
use crate::faq::FaqItem;
use crate::principal::Role;
use crate::report::PostGrantReport;
use crate::review::{Review, ReviewStatus, ReviewerAssignment};
use crate::users::UserProfile;
use crate::whitelist::{WhitelistEntry, WhitelistStatus};

#[async_trait]
pub trait PortalStore: Send + Sync {
    // ── Cycles ──

    async fn list_cycles(&self) -> Result<Vec<ApplicationCycle>>;
    /// Every cycle flagged current. More than one is a data error the caller
    /// reports.
    async fn current_cycles(&self) -> Result<Vec<ApplicationCycle>>;
    /// Apply `edit` to the stored cycle `cycle_id` while it is still the
    /// current one. Conflict once a rollover has retired it. Returns the
    /// stored cycle and whether it changed.
    async fn update_current_cycle(
        &self,
        cycle_id: Uuid,
        edit: &CycleEdit,
    ) -> Result<(ApplicationCycle, bool)>;
    /// Clear the current flag on all cycles and insert `next` as the only
    /// current one. Conflict if a cycle with that name exists.
    async fn rotate_cycle(&self, next: &ApplicationCycle) -> Result<()>;

    // ── Applications ──

    async fn insert_application(&self, app: &Application) -> Result<()>;
    async fn get_application(&self, id: Uuid) -> Result<Option<Application>>;
    async fn list_applications(&self, filter: &ApplicationFilter) -> Result<Vec<Application>>;
    async fn applications_by_creator(
        &self,
        creator_id: &str,
        cycle_name: &str,
    ) -> Result<Vec<Application>>;

    // ── Reviews ──

    /// Create one review per filled slot after validating against existing
    /// reviews and reviewer profiles.
    async fn assign_reviewers(
        &self,
        application_id: Uuid,
        assignment: &ReviewerAssignment,
        allow_dual_role: bool,
    ) -> Result<Vec<Review>>;
    async fn get_review(&self, application_id: Uuid, review_id: Uuid) -> Result<Option<Review>>;
    /// Write `review` only if the stored status is still `expected`.
    /// Conflict otherwise.
    async fn save_review(&self, review: &Review, expected: ReviewStatus) -> Result<()>;
    /// Remove a review that has not been started. Conflict otherwise.
    async fn remove_unstarted_review(&self, application_id: Uuid, review_id: Uuid)
        -> Result<Review>;
    async fn reviews_for_application(&self, application_id: Uuid) -> Result<Vec<Review>>;
    async fn reviews_for_reviewer(&self, reviewer_id: &str) -> Result<Vec<Review>>;

    // ── Decisions ──

    /// Upsert the decision document and mirror the coarse decision onto the
    /// application in one write.
    async fn finalize_decision(
        &self,
        application_id: Uuid,
        amount: FundingAmount,
        comments: Option<String>,
    ) -> Result<Decision>;
    async fn update_decision_comments(&self, application_id: Uuid, comments: &str)
        -> Result<Decision>;
    async fn get_decision(&self, application_id: Uuid) -> Result<Option<Decision>>;
    async fn decisions_for(&self, application_ids: &[Uuid]) -> Result<HashMap<Uuid, Decision>>;

    // ── Post-grant reports ──

    /// Conflict if the application already has a report.
    async fn insert_report_if_absent(&self, report: &PostGrantReport) -> Result<()>;
    async fn report_for_application(&self, application_id: Uuid)
        -> Result<Option<PostGrantReport>>;
    async fn list_reports(&self) -> Result<Vec<PostGrantReport>>;

    // ── Reviewer whitelist ──

    /// Conflict on a duplicate email.
    async fn insert_whitelist_entry(&self, entry: &WhitelistEntry) -> Result<()>;
    async fn list_whitelist(&self) -> Result<Vec<WhitelistEntry>>;
    async fn find_whitelist_by_email(&self, email: &str) -> Result<Option<WhitelistEntry>>;
    async fn set_whitelist_status(
        &self,
        entry_id: Uuid,
        status: WhitelistStatus,
    ) -> Result<WhitelistEntry>;
    async fn delete_whitelist_entry(&self, entry_id: Uuid) -> Result<()>;

    // ── Profiles ──

    async fn save_profile(&self, profile: &UserProfile) -> Result<()>;
    async fn get_profile(&self, user_id: &str, role: Role) -> Result<Option<UserProfile>>;

    // ── FAQ ──

    async fn list_faqs(&self) -> Result<Vec<FaqItem>>;
    async fn save_faq(&self, item: &FaqItem) -> Result<()>;
    async fn delete_faq(&self, faq_id: Uuid) -> Result<()>;
}
