//! Funding decision handlers.
//!
//! PUT /applications/:id/decision            record the award
//! PUT /applications/:id/decision/comments   edit comments only
//! GET /applications/:id/decision            admin view (null when undecided)
//! GET /results/mine                         applicant results once released

use std::sync::Arc;

use axum::{extract::Path, Extension, Json};
use grant_portal_core::decision::{ApplicantResult, Decision, FundingDecisionRequest};
use grant_portal_core::principal::Principal;
use grant_portal_core::PortalService;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct CommentsUpdate {
    pub comments: String,
}

pub async fn record(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<PortalService>>,
    Path(id): Path<Uuid>,
    Json(request): Json<FundingDecisionRequest>,
) -> Result<Json<Decision>, AppError> {
    let decision = service
        .record_funding_decision(&principal, id, request)
        .await?;
    Ok(Json(decision))
}

pub async fn update_comments(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<PortalService>>,
    Path(id): Path<Uuid>,
    Json(body): Json<CommentsUpdate>,
) -> Result<Json<Decision>, AppError> {
    let decision = service
        .update_decision_comments(&principal, id, &body.comments)
        .await?;
    Ok(Json(decision))
}

pub async fn get(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<PortalService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Option<Decision>>, AppError> {
    Ok(Json(service.get_decision(&principal, id).await?))
}

pub async fn my_results(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<PortalService>>,
) -> Result<Json<Vec<ApplicantResult>>, AppError> {
    Ok(Json(service.applicant_results(&principal).await?))
}
