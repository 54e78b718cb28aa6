//! Funding decisions
//!
//! Stored in `decision-data`, keyed by application id. Acceptance is derived
//! from the funding amount: any positive award accepts the application.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::{ApplicationDecision, GrantType};
use crate::error::PortalError;
use crate::review::ApplicantFeedback;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub application_id: Uuid,
    pub funding_amount: Decimal,
    pub is_accepted: bool,
    #[serde(default)]
    pub comments: String,
    pub decision: ApplicationDecision,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Decision {
    /// Build a new decision, or merge the amount into an existing one.
    pub fn upsert(
        existing: Option<Decision>,
        application_id: Uuid,
        amount: FundingAmount,
        comments: Option<String>,
    ) -> Decision {
        let now = Utc::now();
        let mut decision = existing.unwrap_or_else(|| Decision {
            application_id,
            funding_amount: Decimal::ZERO,
            is_accepted: false,
            comments: String::new(),
            decision: ApplicationDecision::Pending,
            created_at: now,
            updated_at: now,
        });
        decision.funding_amount = amount.value();
        decision.is_accepted = amount.is_accepted();
        decision.decision = ApplicationDecision::from_acceptance(amount.is_accepted());
        if let Some(comments) = comments {
            decision.comments = comments;
        }
        decision.updated_at = now;
        decision
    }
}

/// A validated, non-negative award.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FundingAmount(Decimal);

impl FundingAmount {
    pub fn new(amount: Decimal) -> Result<Self, PortalError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PortalError::InvalidInput(format!(
                "funding amount must not be negative, got {amount}"
            )));
        }
        Ok(Self(amount))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_accepted(&self) -> bool {
        self.0 > Decimal::ZERO
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FundingDecisionRequest {
    pub funding_amount: Decimal,
    #[serde(default)]
    pub comments: Option<String>,
}

/// What an applicant sees once decisions are released.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicantResult {
    pub application_id: Uuid,
    pub title: String,
    pub grant_type: GrantType,
    pub decision: ApplicationDecision,
    pub funding_amount: Option<Decimal>,
    pub comments: Option<String>,
    pub feedback: Vec<ApplicantFeedback>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::FromPrimitive;

    #[test]
    fn acceptance_follows_amount() {
        let zero = FundingAmount::new(Decimal::ZERO).unwrap();
        assert!(!zero.is_accepted());

        let award = FundingAmount::new(Decimal::from_i64(25_000).unwrap()).unwrap();
        assert!(award.is_accepted());

        let err = FundingAmount::new(Decimal::from_i64(-1).unwrap()).unwrap_err();
        assert!(matches!(err, PortalError::InvalidInput(_)));
    }

    #[test]
    fn negative_zero_is_zero() {
        let neg_zero = Decimal::new(-0, 2);
        assert!(!FundingAmount::new(neg_zero).unwrap().is_accepted());
    }

    #[test]
    fn upsert_keeps_comments_and_created_at() {
        let id = Uuid::new_v4();
        let first = Decision::upsert(
            None,
            id,
            FundingAmount::new(Decimal::ZERO).unwrap(),
            Some("needs more preliminary data".into()),
        );
        assert_eq!(first.decision, ApplicationDecision::Rejected);

        let second = Decision::upsert(
            Some(first.clone()),
            id,
            FundingAmount::new(Decimal::from_i64(10_000).unwrap()).unwrap(),
            None,
        );
        assert!(second.is_accepted);
        assert_eq!(second.decision, ApplicationDecision::Accepted);
        assert_eq!(second.comments, "needs more preliminary data");
        assert_eq!(second.created_at, first.created_at);
    }
}
