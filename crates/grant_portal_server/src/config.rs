//! Server configuration from environment variables.
//!
//!   GRANT_PORTAL_BIND_ADDR       : listen address (default: 0.0.0.0:4200)
//!   GRANT_PORTAL_DATABASE_URL    : Postgres connection string (absent: in-memory store)
//!   GRANT_PORTAL_BLOB_ROOT       : directory for uploaded files (default: ./blobs)
//!   GRANT_PORTAL_POLICY_FILE     : optional YAML policy file
//!   GRANT_PORTAL_STAGE_POLICY    : forward_only | unordered (overrides the file)
//!   GRANT_PORTAL_ALLOW_DUAL_ROLE : true | false (overrides the file)

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use grant_portal_core::policy::{PortalPolicy, StagePolicy};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:4200";
const DEFAULT_BLOB_ROOT: &str = "./blobs";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub database_url: Option<String>,
    pub blob_root: PathBuf,
    pub policy: PortalPolicy,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup, so tests need not touch the process env.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bind_addr =
            lookup("GRANT_PORTAL_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into());
        let database_url = lookup("GRANT_PORTAL_DATABASE_URL").filter(|s| !s.trim().is_empty());
        let blob_root = lookup("GRANT_PORTAL_BLOB_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BLOB_ROOT));

        let mut policy = match lookup("GRANT_PORTAL_POLICY_FILE") {
            Some(path) => PortalPolicy::from_yaml_file(&path)?,
            None => PortalPolicy::default(),
        };
        if let Some(raw) = lookup("GRANT_PORTAL_STAGE_POLICY") {
            policy.stage_policy = raw
                .parse::<StagePolicy>()
                .context("GRANT_PORTAL_STAGE_POLICY")?;
        }
        if let Some(raw) = lookup("GRANT_PORTAL_ALLOW_DUAL_ROLE") {
            policy.allow_dual_role = parse_bool(&raw).context("GRANT_PORTAL_ALLOW_DUAL_ROLE")?;
        }

        Ok(Self {
            bind_addr,
            database_url,
            blob_root,
            policy,
        })
    }
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("expected a boolean, got '{other}'"),
    }
}
