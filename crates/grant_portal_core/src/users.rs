//! Accounts and role assignment
//!
//! Profiles are portal documents (`applicants`, `reviewers`). Roles themselves
//! belong to the identity provider and are recorded through [`RoleDirectory`].

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::PortalError;
use crate::principal::{normalize_email, Principal, Role};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub affiliation: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileForm {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub affiliation: String,
}

impl ProfileForm {
    pub fn into_profile(self, principal: &Principal, role: Role) -> UserProfile {
        UserProfile {
            user_id: principal.user_id.clone(),
            email: principal.normalized_email(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            title: self.title.trim().to_string(),
            affiliation: self.affiliation.trim().to_string(),
            role,
            created_at: Utc::now(),
        }
    }
}

/// Identity-provider role claims.
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    async fn assign_role(&self, email: &str, role: Role) -> Result<(), PortalError>;

    async fn roles_for(&self, email: &str) -> Result<Vec<Role>, PortalError>;
}

/// Role directory held in process memory.
#[derive(Default, Clone)]
pub struct InMemoryRoleDirectory {
    roles: Arc<RwLock<HashMap<String, BTreeSet<Role>>>>,
}

impl InMemoryRoleDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoleDirectory for InMemoryRoleDirectory {
    async fn assign_role(&self, email: &str, role: Role) -> Result<(), PortalError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(PortalError::InvalidInput("email is required".into()));
        }
        self.roles
            .write()
            .await
            .entry(email)
            .or_default()
            .insert(role);
        Ok(())
    }

    async fn roles_for(&self, email: &str) -> Result<Vec<Role>, PortalError> {
        Ok(self
            .roles
            .read()
            .await
            .get(&normalize_email(email))
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default())
    }
}
