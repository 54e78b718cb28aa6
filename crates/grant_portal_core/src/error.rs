use thiserror::Error;

use crate::blob_store::BlobStoreError;

pub type Result<T> = std::result::Result<T, PortalError>;

#[derive(Debug, Error)]
pub enum PortalError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid {entity} transition: {from} -> {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("cycle stage is '{current}', operation requires '{required}'")]
    StageClosed { current: String, required: String },

    #[error("deadline passed: {0}")]
    DeadlinePassed(String),

    #[error("no current application cycle")]
    NoCurrentCycle,

    #[error("{0} application cycles are flagged current")]
    MultipleCurrentCycles(usize),

    #[error("blob store: {0}")]
    Blob(#[from] BlobStoreError),

    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}

impl PortalError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Unauthorized(_) => 403,
            Self::Conflict(_) => 409,
            Self::InvalidInput(_) => 400,
            Self::InvalidTransition { .. } => 409,
            Self::StageClosed { .. } | Self::DeadlinePassed(_) => 423,
            Self::NoCurrentCycle => 503,
            Self::MultipleCurrentCycles(_) => 500,
            Self::Blob(BlobStoreError::NotFound(_)) => 404,
            Self::Blob(BlobStoreError::InvalidRef(_)) => 400,
            Self::Blob(_) => 502,
            Self::Internal(_) => 500,
        }
    }

    pub(crate) fn not_found(kind: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{kind} {id}"))
    }
}
