//! Workflow policy knobs
//!
//! Loaded from YAML or assembled from environment variables by the server.

use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::PortalError;

/// How cycle stage changes are validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StagePolicy {
    /// Stages may only move forward (skipping is allowed).
    #[default]
    ForwardOnly,
    /// Any stage may follow any other.
    Unordered,
}

impl FromStr for StagePolicy {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forward_only" | "forward-only" => Ok(Self::ForwardOnly),
            "unordered" => Ok(Self::Unordered),
            other => Err(PortalError::InvalidInput(format!(
                "unknown stage policy '{other}'. Valid values: forward_only, unordered"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalPolicy {
    pub stage_policy: StagePolicy,
    /// Let one reviewer hold both the primary and the secondary role on the
    /// same application.
    pub allow_dual_role: bool,
}

impl PortalPolicy {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, PortalError> {
        serde_yaml::from_str(yaml)
            .map_err(|e| PortalError::InvalidInput(format!("policy yaml: {e}")))
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading policy file {}", path.display()))?;
        Ok(Self::from_yaml_str(&raw)?)
    }
}
