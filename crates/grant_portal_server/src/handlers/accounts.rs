//! Account registration.
//!
//! POST /accounts/applicant   applicant profile for the caller
//! POST /accounts/reviewer    reviewer profile (whitelisted emails only)
//! POST /accounts/admin       grant the admin role to an email

use std::sync::Arc;

use axum::{http::StatusCode, Extension, Json};
use grant_portal_core::principal::Principal;
use grant_portal_core::users::{ProfileForm, UserProfile};
use grant_portal_core::PortalService;
use serde::Deserialize;

use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct AdminGrant {
    pub email: String,
}

pub async fn register_applicant(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<PortalService>>,
    Json(form): Json<ProfileForm>,
) -> Result<(StatusCode, Json<UserProfile>), AppError> {
    let profile = service.register_applicant(&principal, form).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

pub async fn register_reviewer(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<PortalService>>,
    Json(form): Json<ProfileForm>,
) -> Result<(StatusCode, Json<UserProfile>), AppError> {
    let profile = service.register_reviewer(&principal, form).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

pub async fn grant_admin(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<PortalService>>,
    Json(body): Json<AdminGrant>,
) -> Result<StatusCode, AppError> {
    service.grant_admin_role(&principal, &body.email).await?;
    Ok(StatusCode::NO_CONTENT)
}
