//! Reviewer whitelist entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::principal::normalize_email;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhitelistStatus {
    #[default]
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhitelistEntry {
    pub entry_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub affiliation: String,
    #[serde(default)]
    pub title: String,
    pub added_at: DateTime<Utc>,
    pub added_by: String,
    pub status: WhitelistStatus,
}

impl WhitelistEntry {
    pub fn is_active(&self) -> bool {
        self.status == WhitelistStatus::Active
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewWhitelistEntry {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub affiliation: String,
    #[serde(default)]
    pub title: String,
}

impl NewWhitelistEntry {
    pub fn into_entry(self, added_by: impl Into<String>) -> WhitelistEntry {
        WhitelistEntry {
            entry_id: Uuid::new_v4(),
            email: normalize_email(&self.email),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            affiliation: self.affiliation.trim().to_string(),
            title: self.title.trim().to_string(),
            added_at: Utc::now(),
            added_by: added_by.into(),
            status: WhitelistStatus::Active,
        }
    }
}

/// Unique, sorted, non-empty affiliations.
pub fn unique_affiliations(entries: &[WhitelistEntry]) -> Vec<String> {
    let set: std::collections::BTreeSet<&str> = entries
        .iter()
        .map(|e| e.affiliation.as_str())
        .filter(|a| !a.is_empty())
        .collect();
    set.into_iter().map(str::to_string).collect()
}
