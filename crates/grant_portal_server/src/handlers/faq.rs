use std::sync::Arc;

use axum::{extract::Path, http::StatusCode, Extension, Json};
use grant_portal_core::faq::{FaqItem, UpsertFaq};
use grant_portal_core::principal::Principal;
use grant_portal_core::PortalService;
use uuid::Uuid;

use crate::error::AppError;

pub async fn list(
    Extension(service): Extension<Arc<PortalService>>,
) -> Result<Json<Vec<FaqItem>>, AppError> {
    Ok(Json(service.list_faqs().await?))
}

pub async fn upsert(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<PortalService>>,
    Json(faq): Json<UpsertFaq>,
) -> Result<Json<FaqItem>, AppError> {
    Ok(Json(service.upsert_faq(&principal, faq).await?))
}

pub async fn delete(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<PortalService>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    service.delete_faq(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
