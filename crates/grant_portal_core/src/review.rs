//! Review Record Lifecycle
//!
//! Each assigned reviewer owns one review record per application:
//!
//! ```text
//! not-started ──save──▶ in-progress ──submit──▶ completed
//!      └─────────────────submit────────────────────┘
//! ```
//!
//! `completed` is terminal. Aggregate status across an application's reviews
//! is derived on read and never stored.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::{Application, ApplicationDecision, GrantType};
use crate::error::PortalError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewerRole {
    Primary,
    Secondary,
}

impl ReviewerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Self::Primary => Self::Secondary,
            Self::Secondary => Self::Primary,
        }
    }
}

impl std::fmt::Display for ReviewerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReviewStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not-started",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Valid lifecycle moves. Re-saving an in-progress review is a self-loop.
    pub fn can_transition_to(&self, target: ReviewStatus) -> bool {
        use ReviewStatus::*;
        matches!(
            (self, target),
            (NotStarted, InProgress)
                | (NotStarted, Completed)
                | (InProgress, InProgress)
                | (InProgress, Completed)
        )
    }
}

impl FromStr for ReviewStatus {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not-started" => Ok(Self::NotStarted),
            "in-progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            _ => Err(PortalError::InvalidInput(format!("unknown review status '{s}'"))),
        }
    }
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Review score on a 1..=5 scale, lower is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Score(u8);

impl Score {
    pub const BEST: Score = Score(1);
    pub const WORST: Score = Score(5);

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Score {
    type Error = PortalError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (1..=5).contains(&value) {
            Ok(Self(value))
        } else {
            Err(PortalError::InvalidInput(format!(
                "score must be between 1 and 5, got {value}"
            )))
        }
    }
}

impl From<Score> for u8 {
    fn from(score: Score) -> u8 {
        score.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewFeedback {
    pub significance: String,
    pub approach: String,
    pub feasibility: String,
    pub investigator: String,
    pub summary: String,
    /// Notes for the committee only
    pub internal: String,
}

/// Feedback as shown to the applicant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantFeedback {
    pub significance: String,
    pub approach: String,
    pub feasibility: String,
    pub investigator: String,
    pub summary: String,
}

impl ReviewFeedback {
    pub fn for_applicant(&self) -> ApplicantFeedback {
        ApplicantFeedback {
            significance: self.significance.clone(),
            approach: self.approach.clone(),
            feasibility: self.feasibility.clone(),
            investigator: self.investigator.clone(),
            summary: self.summary.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub review_id: Uuid,
    pub application_id: Uuid,
    pub reviewer_id: String,
    pub reviewer_role: ReviewerRole,
    pub status: ReviewStatus,
    pub score: Option<Score>,
    #[serde(default)]
    pub feedback: ReviewFeedback,
    pub cycle_name: String,
    pub submitted_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Review {
    pub fn new(
        application_id: Uuid,
        reviewer_id: impl Into<String>,
        reviewer_role: ReviewerRole,
        cycle_name: impl Into<String>,
    ) -> Self {
        Self {
            review_id: Uuid::new_v4(),
            application_id,
            reviewer_id: reviewer_id.into(),
            reviewer_role,
            status: ReviewStatus::NotStarted,
            score: None,
            feedback: ReviewFeedback::default(),
            cycle_name: cycle_name.into(),
            submitted_at: None,
            updated_at: Utc::now(),
        }
    }

    fn check_transition(&self, to: ReviewStatus) -> Result<(), PortalError> {
        if self.status.can_transition_to(to) {
            Ok(())
        } else {
            Err(PortalError::InvalidTransition {
                entity: "review",
                from: self.status.to_string(),
                to: to.to_string(),
            })
        }
    }

    /// Partial save. Score is optional; an omitted score keeps the stored one.
    pub fn save_progress(
        &mut self,
        feedback: ReviewFeedback,
        score: Option<Score>,
    ) -> Result<(), PortalError> {
        self.check_transition(ReviewStatus::InProgress)?;
        self.feedback = feedback;
        if score.is_some() {
            self.score = score;
        }
        self.status = ReviewStatus::InProgress;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Final submission. Returns `false` when this is an identical
    /// re-submission of an already completed review.
    pub fn submit(&mut self, score: Score, feedback: ReviewFeedback) -> Result<bool, PortalError> {
        if self.status == ReviewStatus::Completed
            && self.score == Some(score)
            && self.feedback == feedback
        {
            return Ok(false);
        }
        self.check_transition(ReviewStatus::Completed)?;

        let now = Utc::now();
        self.score = Some(score);
        self.feedback = feedback;
        self.status = ReviewStatus::Completed;
        self.submitted_at = Some(now);
        self.updated_at = now;
        Ok(true)
    }
}

/// Reviewer's form payload, used for both partial saves and final submission.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewDraft {
    #[serde(default)]
    pub score: Option<u8>,
    #[serde(default)]
    pub feedback: ReviewFeedback,
}

impl ReviewDraft {
    pub fn score(&self) -> Result<Option<Score>, PortalError> {
        self.score.map(Score::try_from).transpose()
    }

    pub fn required_score(&self) -> Result<Score, PortalError> {
        self.score()?
            .ok_or_else(|| PortalError::InvalidInput("a score is required to submit".into()))
    }
}

/// Sort newest update first.
pub fn sort_recently_updated(reviews: &mut [Review]) {
    reviews.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
}

/// `completed` only when both roles are filled and done; `in-progress` as
/// soon as any review record exists.
pub fn aggregate_review_status(reviews: &[Review]) -> ReviewStatus {
    let done = |role: ReviewerRole| {
        reviews
            .iter()
            .any(|r| r.reviewer_role == role && r.status == ReviewStatus::Completed)
    };
    if done(ReviewerRole::Primary) && done(ReviewerRole::Secondary) {
        ReviewStatus::Completed
    } else if !reviews.is_empty() {
        ReviewStatus::InProgress
    } else {
        ReviewStatus::NotStarted
    }
}

/// Reviewer assignment request. Either slot may be left empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewerAssignment {
    #[serde(default)]
    pub primary: Option<String>,
    #[serde(default)]
    pub secondary: Option<String>,
}

impl ReviewerAssignment {
    pub fn slots(&self) -> Vec<(ReviewerRole, &str)> {
        let mut slots = Vec::with_capacity(2);
        if let Some(p) = self.primary.as_deref() {
            slots.push((ReviewerRole::Primary, p));
        }
        if let Some(s) = self.secondary.as_deref() {
            slots.push((ReviewerRole::Secondary, s));
        }
        slots
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_none() && self.secondary.is_none()
    }

    /// Check this request against the reviews already on the application.
    /// Store adapters call this under the same lock/transaction as the insert.
    pub fn validate(&self, existing: &[Review], allow_dual_role: bool) -> Result<(), PortalError> {
        if self.is_empty() {
            return Err(PortalError::InvalidInput(
                "at least one reviewer is required".into(),
            ));
        }
        if !allow_dual_role {
            if let (Some(p), Some(s)) = (&self.primary, &self.secondary) {
                if p == s {
                    return Err(PortalError::Conflict(format!(
                        "{p} cannot be both primary and secondary reviewer"
                    )));
                }
            }
        }
        for (role, reviewer) in self.slots() {
            if existing.iter().any(|r| r.reviewer_role == role) {
                return Err(PortalError::Conflict(format!(
                    "{role} reviewer already assigned"
                )));
            }
            if !allow_dual_role
                && existing
                    .iter()
                    .any(|r| r.reviewer_id == reviewer && r.reviewer_role == role.opposite())
            {
                return Err(PortalError::Conflict(format!(
                    "{reviewer} is already the {} reviewer",
                    role.opposite()
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewSummary {
    pub application_id: Uuid,
    pub primary: Option<Review>,
    pub secondary: Option<Review>,
    pub status: ReviewStatus,
}

impl ReviewSummary {
    pub fn from_reviews(application_id: Uuid, reviews: &[Review]) -> Self {
        let pick = |role: ReviewerRole| reviews.iter().find(|r| r.reviewer_role == role).cloned();
        Self {
            application_id,
            primary: pick(ReviewerRole::Primary),
            secondary: pick(ReviewerRole::Secondary),
            status: aggregate_review_status(reviews),
        }
    }
}

/// One row of the admin assignment board.
#[derive(Debug, Clone, Serialize)]
pub struct AssignmentRow {
    pub application_id: Uuid,
    pub title: String,
    pub grant_type: GrantType,
    pub decision: ApplicationDecision,
    pub primary_reviewer: Option<String>,
    pub secondary_reviewer: Option<String>,
    pub review_status: ReviewStatus,
}

impl AssignmentRow {
    pub fn new(app: &Application, reviews: &[Review]) -> Self {
        let reviewer = |role: ReviewerRole| {
            reviews
                .iter()
                .find(|r| r.reviewer_role == role)
                .map(|r| r.reviewer_id.clone())
        };
        Self {
            application_id: app.application_id,
            title: app.title.clone(),
            grant_type: app.grant_type,
            decision: app.decision,
            primary_reviewer: reviewer(ReviewerRole::Primary),
            secondary_reviewer: reviewer(ReviewerRole::Secondary),
            review_status: aggregate_review_status(reviews),
        }
    }
}
