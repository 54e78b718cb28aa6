//! Post-grant report handlers.
//!
//! POST /applications/:id/report   owner uploads the report (accepted apps only)
//! GET  /applications/:id/report   report (if any) and its derived status
//! GET  /reports                   admin tracking table

use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    Extension, Json,
};
use grant_portal_core::principal::Principal;
use grant_portal_core::report::{
    PostGrantReport, ReportFilter, ReportStatus, ReportTrackingRow, SubmitReport,
};
use grant_portal_core::PortalService;
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Serialize)]
pub struct ReportView {
    pub status: ReportStatus,
    pub report: Option<PostGrantReport>,
}

pub async fn submit(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<PortalService>>,
    Path(id): Path<Uuid>,
    Json(submission): Json<SubmitReport>,
) -> Result<(StatusCode, Json<PostGrantReport>), AppError> {
    let report = service
        .submit_post_grant_report(&principal, id, submission)
        .await?;
    Ok((StatusCode::CREATED, Json(report)))
}

pub async fn get(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<PortalService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReportView>, AppError> {
    let report = service.report_for_application(&principal, id).await?;
    let status = service.report_status(&principal, id).await?;
    Ok(Json(ReportView { status, report }))
}

pub async fn tracking(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<PortalService>>,
    Query(filter): Query<ReportFilter>,
) -> Result<Json<Vec<ReportTrackingRow>>, AppError> {
    Ok(Json(service.report_tracking(&principal, &filter).await?))
}
