//! Grant portal REST server: axum router over `PortalService`.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
