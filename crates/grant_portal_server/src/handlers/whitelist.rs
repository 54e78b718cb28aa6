//! Reviewer whitelist handlers.
//!
//! GET    /whitelist                admin listing
//! POST   /whitelist                add a reviewer email
//! PUT    /whitelist/:id/status     activate / deactivate
//! DELETE /whitelist/:id            remove
//! GET    /whitelist/affiliations   distinct affiliations (signup form)

use std::sync::Arc;

use axum::{extract::Path, http::StatusCode, Extension, Json};
use grant_portal_core::principal::Principal;
use grant_portal_core::whitelist::{NewWhitelistEntry, WhitelistEntry, WhitelistStatus};
use grant_portal_core::PortalService;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: WhitelistStatus,
}

pub async fn list(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<PortalService>>,
) -> Result<Json<Vec<WhitelistEntry>>, AppError> {
    Ok(Json(service.list_whitelist(&principal).await?))
}

pub async fn add(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<PortalService>>,
    Json(entry): Json<NewWhitelistEntry>,
) -> Result<(StatusCode, Json<WhitelistEntry>), AppError> {
    let entry = service.add_to_whitelist(&principal, entry).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn set_status(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<PortalService>>,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusChange>,
) -> Result<Json<WhitelistEntry>, AppError> {
    let entry = service
        .set_whitelist_status(&principal, id, body.status)
        .await?;
    Ok(Json(entry))
}

pub async fn remove(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<PortalService>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    service.remove_from_whitelist(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn affiliations(
    Extension(service): Extension<Arc<PortalService>>,
) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(service.whitelist_affiliations().await?))
}
