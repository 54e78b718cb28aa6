//! Post-Grant Report Tracking

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::{Application, ApplicationDecision, GrantType};
use crate::blob_store::StoredFile;
use crate::error::PortalError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostGrantReport {
    pub report_id: Uuid,
    pub application_id: Uuid,
    pub user_id: String,
    pub file: StoredFile,
    pub investigator_name: String,
    pub institution_name: String,
    pub attestation_date: NaiveDate,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitReport {
    pub investigator_name: String,
    pub institution_name: String,
    pub attestation_date: NaiveDate,
    pub file_name: String,
    pub file_base64: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportStatus {
    Pending,
    Submitted,
    Overdue,
    NotRequired,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Submitted => "submitted",
            Self::Overdue => "overdue",
            Self::NotRequired => "not-required",
        }
    }
}

impl FromStr for ReportStatus {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "submitted" => Ok(Self::Submitted),
            "overdue" => Ok(Self::Overdue),
            "not-required" => Ok(Self::NotRequired),
            _ => Err(PortalError::InvalidInput(format!("unknown report status '{s}'"))),
        }
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A submitted report wins over everything, including a passed deadline.
pub fn derive_report_status(
    has_report: bool,
    accepted: bool,
    deadline: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> ReportStatus {
    if has_report {
        return ReportStatus::Submitted;
    }
    if !accepted {
        return ReportStatus::NotRequired;
    }
    match deadline {
        Some(deadline) if now > deadline => ReportStatus::Overdue,
        _ => ReportStatus::Pending,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportTrackingRow {
    pub application_id: Uuid,
    pub title: String,
    pub grant_type: GrantType,
    pub creator_email: String,
    pub status: ReportStatus,
    pub deadline: Option<DateTime<Utc>>,
    pub submitted_at: Option<DateTime<Utc>>,
}

impl ReportTrackingRow {
    pub fn new(
        app: &Application,
        report: Option<&PostGrantReport>,
        deadline: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            application_id: app.application_id,
            title: app.title.clone(),
            grant_type: app.grant_type,
            creator_email: app.creator_email.clone(),
            status: derive_report_status(
                report.is_some(),
                app.decision == ApplicationDecision::Accepted,
                deadline,
                now,
            ),
            deadline,
            submitted_at: report.map(|r| r.submitted_at),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportFilter {
    #[serde(default)]
    pub cycle_name: Option<String>,
    #[serde(default)]
    pub status: Option<ReportStatus>,
    #[serde(default)]
    pub grant_type: Option<GrantType>,
}

impl ReportFilter {
    pub fn matches(&self, row: &ReportTrackingRow) -> bool {
        self.status.map_or(true, |s| row.status == s)
            && self.grant_type.map_or(true, |g| row.grant_type == g)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn status_derivation() {
        let now = Utc::now();
        let past = Some(now - Duration::days(1));
        let future = Some(now + Duration::days(1));

        assert_eq!(derive_report_status(true, true, past, now), ReportStatus::Submitted);
        assert_eq!(derive_report_status(false, true, future, now), ReportStatus::Pending);
        assert_eq!(derive_report_status(false, true, None, now), ReportStatus::Pending);
        assert_eq!(derive_report_status(false, true, past, now), ReportStatus::Overdue);
        assert_eq!(
            derive_report_status(false, false, past, now),
            ReportStatus::NotRequired
        );
    }

    #[test]
    fn deadline_instant_is_still_pending() {
        let now = Utc::now();
        assert_eq!(
            derive_report_status(false, true, Some(now), now),
            ReportStatus::Pending
        );
    }

    #[test]
    fn status_wire_names() {
        assert_eq!(
            serde_json::to_string(&ReportStatus::NotRequired).unwrap(),
            "\"not-required\""
        );
        assert_eq!("overdue".parse::<ReportStatus>().unwrap(), ReportStatus::Overdue);
    }
}
