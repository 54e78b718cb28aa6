//! Review assignment and review form handlers.
//!
//! POST   /applications/:id/reviewers                     assign primary/secondary
//! DELETE /applications/:id/reviewers/:review_id          unassign (not started only)
//! GET    /applications/:id/reviews                       both reviews + aggregate status
//! GET    /reviews/board                                  admin assignment board
//! GET    /reviews/mine                                   caller's reviews
//! PUT    /applications/:id/reviews/:review_id            save progress
//! POST   /applications/:id/reviews/:review_id/submit     submit with score

use std::sync::Arc;

use axum::{extract::Path, http::StatusCode, Extension, Json};
use grant_portal_core::principal::Principal;
use grant_portal_core::review::{
    AssignmentRow, Review, ReviewDraft, ReviewSummary, ReviewerAssignment,
};
use grant_portal_core::PortalService;
use uuid::Uuid;

use crate::error::AppError;

pub async fn assign(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<PortalService>>,
    Path(id): Path<Uuid>,
    Json(assignment): Json<ReviewerAssignment>,
) -> Result<(StatusCode, Json<Vec<Review>>), AppError> {
    let created = service.assign_reviewers(&principal, id, assignment).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn unassign(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<PortalService>>,
    Path((id, review_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Review>, AppError> {
    Ok(Json(
        service.unassign_reviewer(&principal, id, review_id).await?,
    ))
}

pub async fn summary(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<PortalService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReviewSummary>, AppError> {
    Ok(Json(service.review_summary(&principal, id).await?))
}

pub async fn board(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<PortalService>>,
) -> Result<Json<Vec<AssignmentRow>>, AppError> {
    Ok(Json(service.assignment_board(&principal).await?))
}

pub async fn mine(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<PortalService>>,
) -> Result<Json<Vec<Review>>, AppError> {
    Ok(Json(service.reviews_for_reviewer(&principal).await?))
}

pub async fn save_progress(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<PortalService>>,
    Path((id, review_id)): Path<(Uuid, Uuid)>,
    Json(draft): Json<ReviewDraft>,
) -> Result<Json<Review>, AppError> {
    let review = service
        .save_review_progress(&principal, id, review_id, draft)
        .await?;
    Ok(Json(review))
}

pub async fn submit(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<PortalService>>,
    Path((id, review_id)): Path<(Uuid, Uuid)>,
    Json(draft): Json<ReviewDraft>,
) -> Result<Json<Review>, AppError> {
    let review = service
        .submit_review(&principal, id, review_id, draft)
        .await?;
    Ok(Json(review))
}
