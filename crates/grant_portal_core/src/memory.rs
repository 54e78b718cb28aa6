//! In-memory PortalStore
//!
//! Every collection sits behind one lock, so composite operations see and
//! write a consistent snapshot.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::application::{Application, ApplicationDecision, ApplicationFilter};
use crate::cycle::{ApplicationCycle, CycleEdit};
use crate::decision::{Decision, FundingAmount};
use crate::error::{PortalError, Result};
use crate::faq::FaqItem;
use crate::ports::PortalStore;
use crate::principal::{normalize_email, Role};
use crate::report::PostGrantReport;
use crate::review::{Review, ReviewStatus, ReviewerAssignment};
use crate::users::UserProfile;
use crate::whitelist::{WhitelistEntry, WhitelistStatus};

#[derive(Default)]
struct Collections {
    cycles: HashMap<Uuid, ApplicationCycle>,
    applications: HashMap<Uuid, Application>,
    decisions: HashMap<Uuid, Decision>,
    // reviews/{applicationId}/reviewers/{reviewId}
    reviews: HashMap<Uuid, HashMap<Uuid, Review>>,
    reports: HashMap<Uuid, PostGrantReport>,
    whitelist: HashMap<Uuid, WhitelistEntry>,
    applicants: HashMap<String, UserProfile>,
    reviewers: HashMap<String, UserProfile>,
    faqs: HashMap<Uuid, FaqItem>,
}

impl Collections {
    fn profiles(&self, role: Role) -> Option<&HashMap<String, UserProfile>> {
        match role {
            Role::Applicant => Some(&self.applicants),
            Role::Reviewer => Some(&self.reviewers),
            Role::Admin => None,
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a cycle as-is, current flag included.
    #[cfg(test)]
    pub(crate) async fn insert_cycle_raw(&self, cycle: ApplicationCycle) {
        self.inner.write().await.cycles.insert(cycle.cycle_id, cycle);
    }
}

#[async_trait]
impl PortalStore for MemoryStore {
    // ── Cycles ──

    async fn list_cycles(&self) -> Result<Vec<ApplicationCycle>> {
        let mut cycles: Vec<_> = self.inner.read().await.cycles.values().cloned().collect();
        cycles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(cycles)
    }

    async fn current_cycles(&self) -> Result<Vec<ApplicationCycle>> {
        Ok(self
            .inner
            .read()
            .await
            .cycles
            .values()
            .filter(|c| c.current)
            .cloned()
            .collect())
    }

    async fn update_current_cycle(
        &self,
        cycle_id: Uuid,
        edit: &CycleEdit,
    ) -> Result<(ApplicationCycle, bool)> {
        let mut state = self.inner.write().await;
        let cycle = state
            .cycles
            .get_mut(&cycle_id)
            .ok_or_else(|| PortalError::not_found("cycle", cycle_id))?;
        if !cycle.current {
            return Err(PortalError::Conflict(format!(
                "cycle '{}' is no longer current",
                cycle.name
            )));
        }
        let mut updated = cycle.clone();
        let changed = edit.apply(&mut updated)?;
        if changed {
            *cycle = updated.clone();
        }
        Ok((updated, changed))
    }

    async fn rotate_cycle(&self, next: &ApplicationCycle) -> Result<()> {
        let mut state = self.inner.write().await;
        if state.cycles.values().any(|c| c.name == next.name) {
            return Err(PortalError::Conflict(format!(
                "cycle '{}' already exists",
                next.name
            )));
        }
        let today = next.created_at.date_naive();
        for cycle in state.cycles.values_mut().filter(|c| c.current) {
            cycle.current = false;
            cycle.end_date.get_or_insert(today);
            cycle.updated_at = next.created_at;
        }
        let mut next = next.clone();
        next.current = true;
        state.cycles.insert(next.cycle_id, next);
        Ok(())
    }

    // ── Applications ──

    async fn insert_application(&self, app: &Application) -> Result<()> {
        let mut state = self.inner.write().await;
        if state.applications.contains_key(&app.application_id) {
            return Err(PortalError::Conflict(format!(
                "application {} already exists",
                app.application_id
            )));
        }
        state.applications.insert(app.application_id, app.clone());
        Ok(())
    }

    async fn get_application(&self, id: Uuid) -> Result<Option<Application>> {
        Ok(self.inner.read().await.applications.get(&id).cloned())
    }

    async fn list_applications(&self, filter: &ApplicationFilter) -> Result<Vec<Application>> {
        Ok(self
            .inner
            .read()
            .await
            .applications
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect())
    }

    async fn applications_by_creator(
        &self,
        creator_id: &str,
        cycle_name: &str,
    ) -> Result<Vec<Application>> {
        Ok(self
            .inner
            .read()
            .await
            .applications
            .values()
            .filter(|a| a.creator_id == creator_id && a.cycle_name == cycle_name)
            .cloned()
            .collect())
    }

    // ── Reviews ──

    async fn assign_reviewers(
        &self,
        application_id: Uuid,
        assignment: &ReviewerAssignment,
        allow_dual_role: bool,
    ) -> Result<Vec<Review>> {
        let mut state = self.inner.write().await;
        let cycle_name = state
            .applications
            .get(&application_id)
            .map(|a| a.cycle_name.clone())
            .ok_or_else(|| PortalError::not_found("application", application_id))?;

        for (_, reviewer) in assignment.slots() {
            if !state.reviewers.contains_key(reviewer) {
                return Err(PortalError::not_found("reviewer profile", reviewer));
            }
        }

        let existing: Vec<Review> = state
            .reviews
            .get(&application_id)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default();
        assignment.validate(&existing, allow_dual_role)?;

        let created: Vec<Review> = assignment
            .slots()
            .into_iter()
            .map(|(role, reviewer)| Review::new(application_id, reviewer, role, cycle_name.clone()))
            .collect();
        let bucket = state.reviews.entry(application_id).or_default();
        for review in &created {
            bucket.insert(review.review_id, review.clone());
        }
        Ok(created)
    }

    async fn get_review(&self, application_id: Uuid, review_id: Uuid) -> Result<Option<Review>> {
        Ok(self
            .inner
            .read()
            .await
            .reviews
            .get(&application_id)
            .and_then(|m| m.get(&review_id))
            .cloned())
    }

    async fn save_review(&self, review: &Review, expected: ReviewStatus) -> Result<()> {
        let mut state = self.inner.write().await;
        let slot = state
            .reviews
            .get_mut(&review.application_id)
            .and_then(|m| m.get_mut(&review.review_id))
            .ok_or_else(|| PortalError::not_found("review", review.review_id))?;
        if slot.status != expected {
            return Err(PortalError::Conflict(format!(
                "review {} is now {}",
                review.review_id, slot.status
            )));
        }
        *slot = review.clone();
        Ok(())
    }

    async fn remove_unstarted_review(
        &self,
        application_id: Uuid,
        review_id: Uuid,
    ) -> Result<Review> {
        let mut state = self.inner.write().await;
        let bucket = state
            .reviews
            .get_mut(&application_id)
            .ok_or_else(|| PortalError::not_found("review", review_id))?;
        let status = bucket
            .get(&review_id)
            .map(|r| r.status)
            .ok_or_else(|| PortalError::not_found("review", review_id))?;
        if status != ReviewStatus::NotStarted {
            return Err(PortalError::Conflict(format!(
                "review {review_id} is {status} and cannot be unassigned"
            )));
        }
        bucket
            .remove(&review_id)
            .ok_or_else(|| PortalError::not_found("review", review_id))
    }

    async fn reviews_for_application(&self, application_id: Uuid) -> Result<Vec<Review>> {
        Ok(self
            .inner
            .read()
            .await
            .reviews
            .get(&application_id)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn reviews_for_reviewer(&self, reviewer_id: &str) -> Result<Vec<Review>> {
        Ok(self
            .inner
            .read()
            .await
            .reviews
            .values()
            .flat_map(|m| m.values())
            .filter(|r| r.reviewer_id == reviewer_id)
            .cloned()
            .collect())
    }

    // ── Decisions ──

    async fn finalize_decision(
        &self,
        application_id: Uuid,
        amount: FundingAmount,
        comments: Option<String>,
    ) -> Result<Decision> {
        let mut state = self.inner.write().await;
        if !state.applications.contains_key(&application_id) {
            return Err(PortalError::not_found("application", application_id));
        }
        let existing = state.decisions.get(&application_id).cloned();
        let decision = Decision::upsert(existing, application_id, amount, comments);
        state.decisions.insert(application_id, decision.clone());
        if let Some(app) = state.applications.get_mut(&application_id) {
            app.decision = ApplicationDecision::from_acceptance(decision.is_accepted);
        }
        Ok(decision)
    }

    async fn update_decision_comments(
        &self,
        application_id: Uuid,
        comments: &str,
    ) -> Result<Decision> {
        let mut state = self.inner.write().await;
        let decision = state
            .decisions
            .get_mut(&application_id)
            .ok_or_else(|| PortalError::not_found("decision for application", application_id))?;
        decision.comments = comments.to_string();
        decision.updated_at = chrono::Utc::now();
        Ok(decision.clone())
    }

    async fn get_decision(&self, application_id: Uuid) -> Result<Option<Decision>> {
        Ok(self.inner.read().await.decisions.get(&application_id).cloned())
    }

    async fn decisions_for(&self, application_ids: &[Uuid]) -> Result<HashMap<Uuid, Decision>> {
        let state = self.inner.read().await;
        Ok(application_ids
            .iter()
            .filter_map(|id| state.decisions.get(id).map(|d| (*id, d.clone())))
            .collect())
    }

    // ── Post-grant reports ──

    async fn insert_report_if_absent(&self, report: &PostGrantReport) -> Result<()> {
        let mut state = self.inner.write().await;
        if state.reports.contains_key(&report.application_id) {
            return Err(PortalError::Conflict(format!(
                "a post-grant report already exists for application {}",
                report.application_id
            )));
        }
        state.reports.insert(report.application_id, report.clone());
        Ok(())
    }

    async fn report_for_application(
        &self,
        application_id: Uuid,
    ) -> Result<Option<PostGrantReport>> {
        Ok(self.inner.read().await.reports.get(&application_id).cloned())
    }

    async fn list_reports(&self) -> Result<Vec<PostGrantReport>> {
        Ok(self.inner.read().await.reports.values().cloned().collect())
    }

    // ── Reviewer whitelist ──

    async fn insert_whitelist_entry(&self, entry: &WhitelistEntry) -> Result<()> {
        let mut state = self.inner.write().await;
        if state.whitelist.values().any(|e| e.email == entry.email) {
            return Err(PortalError::Conflict(format!(
                "{} is already whitelisted",
                entry.email
            )));
        }
        state.whitelist.insert(entry.entry_id, entry.clone());
        Ok(())
    }

    async fn list_whitelist(&self) -> Result<Vec<WhitelistEntry>> {
        let mut entries: Vec<_> = self.inner.read().await.whitelist.values().cloned().collect();
        entries.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        Ok(entries)
    }

    async fn find_whitelist_by_email(&self, email: &str) -> Result<Option<WhitelistEntry>> {
        let email = normalize_email(email);
        Ok(self
            .inner
            .read()
            .await
            .whitelist
            .values()
            .find(|e| e.email == email)
            .cloned())
    }

    async fn set_whitelist_status(
        &self,
        entry_id: Uuid,
        status: WhitelistStatus,
    ) -> Result<WhitelistEntry> {
        let mut state = self.inner.write().await;
        let entry = state
            .whitelist
            .get_mut(&entry_id)
            .ok_or_else(|| PortalError::not_found("whitelist entry", entry_id))?;
        entry.status = status;
        Ok(entry.clone())
    }

    async fn delete_whitelist_entry(&self, entry_id: Uuid) -> Result<()> {
        self.inner
            .write()
            .await
            .whitelist
            .remove(&entry_id)
            .map(|_| ())
            .ok_or_else(|| PortalError::not_found("whitelist entry", entry_id))
    }

    // ── Profiles ──

    async fn save_profile(&self, profile: &UserProfile) -> Result<()> {
        let mut state = self.inner.write().await;
        let collection = match profile.role {
            Role::Applicant => &mut state.applicants,
            Role::Reviewer => &mut state.reviewers,
            Role::Admin => {
                return Err(PortalError::InvalidInput(
                    "admin accounts have no profile document".into(),
                ))
            }
        };
        collection.insert(profile.user_id.clone(), profile.clone());
        Ok(())
    }

    async fn get_profile(&self, user_id: &str, role: Role) -> Result<Option<UserProfile>> {
        Ok(self
            .inner
            .read()
            .await
            .profiles(role)
            .and_then(|p| p.get(user_id))
            .cloned())
    }

    // ── FAQ ──

    async fn list_faqs(&self) -> Result<Vec<FaqItem>> {
        let mut items: Vec<_> = self.inner.read().await.faqs.values().cloned().collect();
        crate::faq::sort_by_position(&mut items);
        Ok(items)
    }

    async fn save_faq(&self, item: &FaqItem) -> Result<()> {
        self.inner
            .write()
            .await
            .faqs
            .insert(item.faq_id, item.clone());
        Ok(())
    }

    async fn delete_faq(&self, faq_id: Uuid) -> Result<()> {
        self.inner
            .write()
            .await
            .faqs
            .remove(&faq_id)
            .map(|_| ())
            .ok_or_else(|| PortalError::not_found("faq", faq_id))
    }
}
