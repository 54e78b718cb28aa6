//! Application handlers.
//!
//! POST /applications         submit an application (base64 PDF inline)
//! GET  /applications         admin listing, filtered by query
//! GET  /applications/mine    caller's applications in the current cycle
//! GET  /applications/:id     one application

use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    Extension, Json,
};
use grant_portal_core::application::{Application, ApplicationFilter, SubmitApplication};
use grant_portal_core::principal::Principal;
use grant_portal_core::PortalService;
use uuid::Uuid;

use crate::error::AppError;

pub async fn submit(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<PortalService>>,
    Json(submission): Json<SubmitApplication>,
) -> Result<(StatusCode, Json<Application>), AppError> {
    let app = service.submit_application(&principal, submission).await?;
    Ok((StatusCode::CREATED, Json(app)))
}

pub async fn list(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<PortalService>>,
    Query(filter): Query<ApplicationFilter>,
) -> Result<Json<Vec<Application>>, AppError> {
    Ok(Json(service.list_applications(&principal, &filter).await?))
}

pub async fn mine(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<PortalService>>,
) -> Result<Json<Vec<Application>>, AppError> {
    Ok(Json(service.my_applications(&principal).await?))
}

pub async fn get(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<PortalService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Application>, AppError> {
    Ok(Json(service.get_application(&principal, id).await?))
}
