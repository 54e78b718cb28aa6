use std::collections::HashMap;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::pool::PoolConnection;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use grant_portal_core::application::{Application, ApplicationDecision, ApplicationFilter};
use grant_portal_core::cycle::{ApplicationCycle, CycleEdit};
use grant_portal_core::decision::{Decision, FundingAmount};
use grant_portal_core::error::{PortalError, Result};
use grant_portal_core::faq::FaqItem;
use grant_portal_core::ports::PortalStore;
use grant_portal_core::principal::{normalize_email, Role};
use grant_portal_core::report::PostGrantReport;
use grant_portal_core::review::{Review, ReviewStatus, ReviewerAssignment};
use grant_portal_core::users::UserProfile;
use grant_portal_core::whitelist::{WhitelistEntry, WhitelistStatus};

use crate::documents::{
    self as docs, APPLICANTS, APPLICATIONS, CYCLES, DECISIONS, FAQS, REPORTS, REVIEWERS, REVIEWS,
    WHITELIST,
};

/// Postgres-backed portal store.
pub struct PgPortalStore {
    pool: PgPool,
}

impl PgPortalStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn conn(&self) -> Result<PoolConnection<Postgres>> {
        Ok(self.pool.acquire().await.map_err(|e| anyhow!(e))?)
    }
}

fn profile_collection(role: Role) -> Result<&'static str> {
    match role {
        Role::Applicant => Ok(APPLICANTS),
        Role::Reviewer => Ok(REVIEWERS),
        Role::Admin => Err(PortalError::InvalidInput(
            "admin accounts have no profile document".into(),
        )),
    }
}

#[async_trait]
impl PortalStore for PgPortalStore {
    // ── Cycles ──

    async fn list_cycles(&self) -> Result<Vec<ApplicationCycle>> {
        let mut conn = self.conn().await?;
        docs::list(&mut conn, CYCLES).await
    }

    async fn current_cycles(&self) -> Result<Vec<ApplicationCycle>> {
        let mut conn = self.conn().await?;
        let cycles: Vec<ApplicationCycle> = docs::list(&mut conn, CYCLES).await?;
        Ok(cycles.into_iter().filter(|c| c.current).collect())
    }

    async fn update_current_cycle(
        &self,
        cycle_id: Uuid,
        edit: &CycleEdit,
    ) -> Result<(ApplicationCycle, bool)> {
        let key = cycle_id.to_string();
        let mut tx = self.pool.begin().await.map_err(|e| anyhow!(e))?;
        docs::lock(&mut tx, CYCLES).await?;

        let mut cycle: ApplicationCycle = docs::get(&mut tx, CYCLES, &key)
            .await?
            .ok_or_else(|| PortalError::NotFound(format!("cycle {cycle_id}")))?;
        if !cycle.current {
            return Err(PortalError::Conflict(format!(
                "cycle '{}' is no longer current",
                cycle.name
            )));
        }
        let changed = edit.apply(&mut cycle)?;
        if changed {
            docs::put(&mut tx, CYCLES, &key, None, &cycle).await?;
        }

        tx.commit().await.map_err(|e| anyhow!(e))?;
        Ok((cycle, changed))
    }

    async fn rotate_cycle(&self, next: &ApplicationCycle) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(|e| anyhow!(e))?;
        docs::lock(&mut tx, CYCLES).await?;

        let existing: Vec<ApplicationCycle> = docs::list(&mut tx, CYCLES).await?;
        if existing.iter().any(|c| c.name == next.name) {
            return Err(PortalError::Conflict(format!(
                "cycle '{}' already exists",
                next.name
            )));
        }
        let today = next.created_at.date_naive();
        for mut cycle in existing.into_iter().filter(|c| c.current) {
            cycle.current = false;
            cycle.end_date.get_or_insert(today);
            cycle.updated_at = next.created_at;
            docs::put(&mut tx, CYCLES, &cycle.cycle_id.to_string(), None, &cycle).await?;
        }
        let mut next = next.clone();
        next.current = true;
        docs::put(&mut tx, CYCLES, &next.cycle_id.to_string(), None, &next).await?;

        tx.commit().await.map_err(|e| anyhow!(e))?;
        Ok(())
    }

    // ── Applications ──

    async fn insert_application(&self, app: &Application) -> Result<()> {
        let mut conn = self.conn().await?;
        let id = app.application_id.to_string();
        if !docs::insert(&mut conn, APPLICATIONS, &id, None, app).await? {
            return Err(PortalError::Conflict(format!("application {id} already exists")));
        }
        Ok(())
    }

    async fn get_application(&self, id: Uuid) -> Result<Option<Application>> {
        let mut conn = self.conn().await?;
        docs::get(&mut conn, APPLICATIONS, &id.to_string()).await
    }

    async fn list_applications(&self, filter: &ApplicationFilter) -> Result<Vec<Application>> {
        let mut conn = self.conn().await?;
        let apps: Vec<Application> = match &filter.cycle_name {
            Some(cycle) => docs::find_by(&mut conn, APPLICATIONS, "cycle_name", cycle).await?,
            None => docs::list(&mut conn, APPLICATIONS).await?,
        };
        Ok(apps.into_iter().filter(|a| filter.matches(a)).collect())
    }

    async fn applications_by_creator(
        &self,
        creator_id: &str,
        cycle_name: &str,
    ) -> Result<Vec<Application>> {
        let mut conn = self.conn().await?;
        let apps: Vec<Application> =
            docs::find_by(&mut conn, APPLICATIONS, "creator_id", creator_id).await?;
        Ok(apps
            .into_iter()
            .filter(|a| a.cycle_name == cycle_name)
            .collect())
    }

    // ── Reviews ──

    async fn assign_reviewers(
        &self,
        application_id: Uuid,
        assignment: &ReviewerAssignment,
        allow_dual_role: bool,
    ) -> Result<Vec<Review>> {
        let app_key = application_id.to_string();
        let mut tx = self.pool.begin().await.map_err(|e| anyhow!(e))?;
        docs::lock(&mut tx, &format!("{REVIEWS}/{app_key}")).await?;

        let app: Application = docs::get(&mut tx, APPLICATIONS, &app_key)
            .await?
            .ok_or_else(|| PortalError::NotFound(format!("application {application_id}")))?;
        for (_, reviewer) in assignment.slots() {
            let profile: Option<UserProfile> = docs::get(&mut tx, REVIEWERS, reviewer).await?;
            if profile.is_none() {
                return Err(PortalError::NotFound(format!("reviewer profile {reviewer}")));
            }
        }

        let existing: Vec<Review> = docs::children(&mut tx, REVIEWS, &app_key).await?;
        assignment.validate(&existing, allow_dual_role)?;

        let mut created = Vec::new();
        for (role, reviewer) in assignment.slots() {
            let review = Review::new(application_id, reviewer, role, app.cycle_name.clone());
            docs::insert(
                &mut tx,
                REVIEWS,
                &review.review_id.to_string(),
                Some(&app_key),
                &review,
            )
            .await?;
            created.push(review);
        }

        tx.commit().await.map_err(|e| anyhow!(e))?;
        Ok(created)
    }

    async fn get_review(&self, application_id: Uuid, review_id: Uuid) -> Result<Option<Review>> {
        let mut conn = self.conn().await?;
        let review: Option<Review> = docs::get(&mut conn, REVIEWS, &review_id.to_string()).await?;
        Ok(review.filter(|r| r.application_id == application_id))
    }

    async fn save_review(&self, review: &Review, expected: ReviewStatus) -> Result<()> {
        let key = review.review_id.to_string();
        let mut tx = self.pool.begin().await.map_err(|e| anyhow!(e))?;
        docs::lock(&mut tx, &format!("{REVIEWS}/{}", review.application_id)).await?;

        let stored: Review = docs::get(&mut tx, REVIEWS, &key)
            .await?
            .ok_or_else(|| PortalError::NotFound(format!("review {}", review.review_id)))?;
        if stored.status != expected {
            return Err(PortalError::Conflict(format!(
                "review {} is now {}",
                review.review_id, stored.status
            )));
        }
        docs::replace(&mut tx, REVIEWS, &key, review).await?;

        tx.commit().await.map_err(|e| anyhow!(e))?;
        Ok(())
    }

    async fn remove_unstarted_review(
        &self,
        application_id: Uuid,
        review_id: Uuid,
    ) -> Result<Review> {
        let mut tx = self.pool.begin().await.map_err(|e| anyhow!(e))?;
        docs::lock(&mut tx, &format!("{REVIEWS}/{application_id}")).await?;

        let review: Review = docs::get(&mut tx, REVIEWS, &review_id.to_string())
            .await?
            .filter(|r: &Review| r.application_id == application_id)
            .ok_or_else(|| PortalError::NotFound(format!("review {review_id}")))?;
        if review.status != ReviewStatus::NotStarted {
            return Err(PortalError::Conflict(format!(
                "review {review_id} is {} and cannot be unassigned",
                review.status
            )));
        }
        docs::delete(&mut tx, REVIEWS, &review_id.to_string()).await?;

        tx.commit().await.map_err(|e| anyhow!(e))?;
        Ok(review)
    }

    async fn reviews_for_application(&self, application_id: Uuid) -> Result<Vec<Review>> {
        let mut conn = self.conn().await?;
        docs::children(&mut conn, REVIEWS, &application_id.to_string()).await
    }

    async fn reviews_for_reviewer(&self, reviewer_id: &str) -> Result<Vec<Review>> {
        let mut conn = self.conn().await?;
        docs::find_by(&mut conn, REVIEWS, "reviewer_id", reviewer_id).await
    }

    // ── Decisions ──

    async fn finalize_decision(
        &self,
        application_id: Uuid,
        amount: FundingAmount,
        comments: Option<String>,
    ) -> Result<Decision> {
        let key = application_id.to_string();
        let mut tx = self.pool.begin().await.map_err(|e| anyhow!(e))?;
        docs::lock(&mut tx, &format!("{DECISIONS}/{key}")).await?;

        let mut app: Application = docs::get(&mut tx, APPLICATIONS, &key)
            .await?
            .ok_or_else(|| PortalError::NotFound(format!("application {application_id}")))?;
        let existing: Option<Decision> = docs::get(&mut tx, DECISIONS, &key).await?;
        let decision = Decision::upsert(existing, application_id, amount, comments);
        docs::put(&mut tx, DECISIONS, &key, None, &decision).await?;

        app.decision = ApplicationDecision::from_acceptance(decision.is_accepted);
        docs::replace(&mut tx, APPLICATIONS, &key, &app).await?;

        tx.commit().await.map_err(|e| anyhow!(e))?;
        Ok(decision)
    }

    async fn update_decision_comments(
        &self,
        application_id: Uuid,
        comments: &str,
    ) -> Result<Decision> {
        let key = application_id.to_string();
        let mut tx = self.pool.begin().await.map_err(|e| anyhow!(e))?;
        docs::lock(&mut tx, &format!("{DECISIONS}/{key}")).await?;

        let mut decision: Decision = docs::get(&mut tx, DECISIONS, &key).await?.ok_or_else(|| {
            PortalError::NotFound(format!("decision for application {application_id}"))
        })?;
        decision.comments = comments.to_string();
        decision.updated_at = Utc::now();
        docs::replace(&mut tx, DECISIONS, &key, &decision).await?;

        tx.commit().await.map_err(|e| anyhow!(e))?;
        Ok(decision)
    }

    async fn get_decision(&self, application_id: Uuid) -> Result<Option<Decision>> {
        let mut conn = self.conn().await?;
        docs::get(&mut conn, DECISIONS, &application_id.to_string()).await
    }

    async fn decisions_for(&self, application_ids: &[Uuid]) -> Result<HashMap<Uuid, Decision>> {
        let keys: Vec<String> = application_ids.iter().map(Uuid::to_string).collect();
        let mut conn = self.conn().await?;
        let decisions: Vec<Decision> = docs::get_many(&mut conn, DECISIONS, &keys).await?;
        Ok(decisions
            .into_iter()
            .map(|d| (d.application_id, d))
            .collect())
    }

    // ── Post-grant reports ──

    async fn insert_report_if_absent(&self, report: &PostGrantReport) -> Result<()> {
        let mut conn = self.conn().await?;
        let key = report.application_id.to_string();
        if !docs::insert(&mut conn, REPORTS, &key, None, report).await? {
            return Err(PortalError::Conflict(format!(
                "a post-grant report already exists for application {key}"
            )));
        }
        Ok(())
    }

    async fn report_for_application(
        &self,
        application_id: Uuid,
    ) -> Result<Option<PostGrantReport>> {
        let mut conn = self.conn().await?;
        docs::get(&mut conn, REPORTS, &application_id.to_string()).await
    }

    async fn list_reports(&self) -> Result<Vec<PostGrantReport>> {
        let mut conn = self.conn().await?;
        docs::list(&mut conn, REPORTS).await
    }

    // ── Reviewer whitelist ──

    async fn insert_whitelist_entry(&self, entry: &WhitelistEntry) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(|e| anyhow!(e))?;
        docs::lock(&mut tx, WHITELIST).await?;

        let dupes: Vec<WhitelistEntry> =
            docs::find_by(&mut tx, WHITELIST, "email", &entry.email).await?;
        if !dupes.is_empty() {
            return Err(PortalError::Conflict(format!(
                "{} is already whitelisted",
                entry.email
            )));
        }
        docs::insert(&mut tx, WHITELIST, &entry.entry_id.to_string(), None, entry).await?;

        tx.commit().await.map_err(|e| anyhow!(e))?;
        Ok(())
    }

    async fn list_whitelist(&self) -> Result<Vec<WhitelistEntry>> {
        let mut conn = self.conn().await?;
        let mut entries: Vec<WhitelistEntry> = docs::list(&mut conn, WHITELIST).await?;
        entries.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        Ok(entries)
    }

    async fn find_whitelist_by_email(&self, email: &str) -> Result<Option<WhitelistEntry>> {
        let mut conn = self.conn().await?;
        let mut found: Vec<WhitelistEntry> =
            docs::find_by(&mut conn, WHITELIST, "email", &normalize_email(email)).await?;
        Ok(found.pop())
    }

    async fn set_whitelist_status(
        &self,
        entry_id: Uuid,
        status: WhitelistStatus,
    ) -> Result<WhitelistEntry> {
        let key = entry_id.to_string();
        let mut tx = self.pool.begin().await.map_err(|e| anyhow!(e))?;
        docs::lock(&mut tx, WHITELIST).await?;

        let mut entry: WhitelistEntry = docs::get(&mut tx, WHITELIST, &key)
            .await?
            .ok_or_else(|| PortalError::NotFound(format!("whitelist entry {entry_id}")))?;
        entry.status = status;
        docs::replace(&mut tx, WHITELIST, &key, &entry).await?;

        tx.commit().await.map_err(|e| anyhow!(e))?;
        Ok(entry)
    }

    async fn delete_whitelist_entry(&self, entry_id: Uuid) -> Result<()> {
        let mut conn = self.conn().await?;
        if !docs::delete(&mut conn, WHITELIST, &entry_id.to_string()).await? {
            return Err(PortalError::NotFound(format!("whitelist entry {entry_id}")));
        }
        Ok(())
    }

    // ── Profiles ──

    async fn save_profile(&self, profile: &UserProfile) -> Result<()> {
        let collection = profile_collection(profile.role)?;
        let mut conn = self.conn().await?;
        docs::put(&mut conn, collection, &profile.user_id, None, profile).await
    }

    async fn get_profile(&self, user_id: &str, role: Role) -> Result<Option<UserProfile>> {
        let Ok(collection) = profile_collection(role) else {
            return Ok(None);
        };
        let mut conn = self.conn().await?;
        docs::get(&mut conn, collection, user_id).await
    }

    // ── FAQ ──

    async fn list_faqs(&self) -> Result<Vec<FaqItem>> {
        let mut conn = self.conn().await?;
        let mut items: Vec<FaqItem> = docs::list(&mut conn, FAQS).await?;
        grant_portal_core::faq::sort_by_position(&mut items);
        Ok(items)
    }

    async fn save_faq(&self, item: &FaqItem) -> Result<()> {
        let mut conn = self.conn().await?;
        docs::put(&mut conn, FAQS, &item.faq_id.to_string(), None, item).await
    }

    async fn delete_faq(&self, faq_id: Uuid) -> Result<()> {
        let mut conn = self.conn().await?;
        if !docs::delete(&mut conn, FAQS, &faq_id.to_string()).await? {
            return Err(PortalError::NotFound(format!("faq {faq_id}")));
        }
        Ok(())
    }
}
