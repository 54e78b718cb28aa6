use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PortalError;

/// Portal roles as recorded by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Applicant,
    Reviewer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applicant => "applicant",
            Self::Reviewer => "reviewer",
            Self::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "applicant" => Ok(Self::Applicant),
            "reviewer" => Ok(Self::Reviewer),
            "admin" => Ok(Self::Admin),
            other => Err(PortalError::InvalidInput(format!("unknown role '{other}'"))),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The caller of a portal operation.
///
/// Built at the server boundary from identity headers the gateway has already
/// verified. Core logic never sees raw credentials.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: String,
    pub email: String,
    pub roles: Vec<Role>,
}

impl Principal {
    pub fn new(user_id: impl Into<String>, email: impl Into<String>, roles: Vec<Role>) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
            roles,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    pub fn require_role(&self, role: Role) -> Result<(), PortalError> {
        if self.has_role(role) {
            Ok(())
        } else {
            Err(PortalError::Unauthorized(format!(
                "{} is not a {}",
                self.user_id, role
            )))
        }
    }

    pub fn require_admin(&self) -> Result<(), PortalError> {
        self.require_role(Role::Admin)
    }

    /// Email normalised the same way whitelist entries are stored.
    pub fn normalized_email(&self) -> String {
        normalize_email(&self.email)
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
