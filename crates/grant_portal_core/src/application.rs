//! Grant Application Types

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::blob_store::StoredFile;
use crate::error::PortalError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantType {
    Research,
    Nextgen,
    Nonresearch,
}

impl GrantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Research => "research",
            Self::Nextgen => "nextgen",
            Self::Nonresearch => "nonresearch",
        }
    }
}

impl FromStr for GrantType {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "research" => Ok(Self::Research),
            "nextgen" => Ok(Self::Nextgen),
            "nonresearch" => Ok(Self::Nonresearch),
            _ => Err(PortalError::InvalidInput(format!("unknown grant type '{s}'"))),
        }
    }
}

impl std::fmt::Display for GrantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Coarse outcome mirrored onto the application. Informational only; the
/// decision record is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationDecision {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

impl ApplicationDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    pub fn from_acceptance(accepted: bool) -> Self {
        if accepted {
            Self::Accepted
        } else {
            Self::Rejected
        }
    }
}

impl std::fmt::Display for ApplicationDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub application_id: Uuid,
    pub grant_type: GrantType,
    pub title: String,
    pub creator_id: String,
    pub creator_email: String,
    /// Free-form answers to the track's questionnaire
    #[serde(default)]
    pub answers: BTreeMap<String, serde_json::Value>,
    pub file: StoredFile,
    pub cycle_name: String,
    #[serde(default)]
    pub decision: ApplicationDecision,
    pub submitted_at: DateTime<Utc>,
}

impl Application {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.creator_id == user_id
    }
}

/// Applicant submission payload. The proposal PDF travels base64-encoded
/// alongside the form fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitApplication {
    pub grant_type: GrantType,
    pub title: String,
    #[serde(default)]
    pub answers: BTreeMap<String, serde_json::Value>,
    pub file_name: String,
    pub file_base64: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicationFilter {
    #[serde(default)]
    pub cycle_name: Option<String>,
    #[serde(default)]
    pub decision: Option<ApplicationDecision>,
    #[serde(default)]
    pub grant_type: Option<GrantType>,
}

impl ApplicationFilter {
    pub fn for_cycle(cycle_name: impl Into<String>) -> Self {
        Self {
            cycle_name: Some(cycle_name.into()),
            ..Default::default()
        }
    }

    pub fn matches(&self, app: &Application) -> bool {
        self.cycle_name
            .as_ref()
            .map_or(true, |c| &app.cycle_name == c)
            && self.decision.map_or(true, |d| app.decision == d)
            && self.grant_type.map_or(true, |g| app.grant_type == g)
    }
}

/// Newest submissions first.
pub fn sort_newest_first(apps: &mut [Application]) {
    apps.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn application(cycle: &str, grant_type: GrantType, creator: &str) -> Application {
        Application {
            application_id: Uuid::new_v4(),
            grant_type,
            title: format!("{grant_type} proposal"),
            creator_id: creator.to_string(),
            creator_email: format!("{creator}@example.org"),
            answers: BTreeMap::new(),
            file: StoredFile {
                blob_ref: "memory://pdfs/x/proposal.pdf".into(),
                file_name: "proposal.pdf".into(),
                content_type: "application/pdf".into(),
                size_bytes: 4,
                sha256: "00".into(),
            },
            cycle_name: cycle.to_string(),
            decision: ApplicationDecision::Pending,
            submitted_at: Utc::now(),
        }
    }
}
