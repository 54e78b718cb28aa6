//! Application cycle handlers.
//!
//! GET  /cycles                     all cycles, newest first
//! GET  /cycles/current             the current cycle
//! PUT  /cycles/current/stage       move the current cycle to another stage
//! PUT  /cycles/current/deadlines   set per-track deadlines
//! POST /cycles/rollover            end the current cycle and open a new one

use std::sync::Arc;

use axum::{Extension, Json};
use grant_portal_core::cycle::{ApplicationCycle, CycleStage, DeadlineUpdate};
use grant_portal_core::principal::Principal;
use grant_portal_core::PortalService;
use serde::Deserialize;

use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct StageChange {
    pub stage: CycleStage,
}

#[derive(Debug, Deserialize)]
pub struct Rollover {
    pub name: String,
}

pub async fn list_cycles(
    Extension(service): Extension<Arc<PortalService>>,
) -> Result<Json<Vec<ApplicationCycle>>, AppError> {
    Ok(Json(service.list_cycles().await?))
}

pub async fn current_cycle(
    Extension(service): Extension<Arc<PortalService>>,
) -> Result<Json<ApplicationCycle>, AppError> {
    Ok(Json(service.current_cycle().await?))
}

pub async fn update_stage(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<PortalService>>,
    Json(body): Json<StageChange>,
) -> Result<Json<ApplicationCycle>, AppError> {
    let cycle = service.update_cycle_stage(&principal, body.stage).await?;
    Ok(Json(cycle))
}

pub async fn set_deadlines(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<PortalService>>,
    Json(update): Json<DeadlineUpdate>,
) -> Result<Json<ApplicationCycle>, AppError> {
    let cycle = service.set_cycle_deadlines(&principal, update).await?;
    Ok(Json(cycle))
}

pub async fn rollover(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<PortalService>>,
    Json(body): Json<Rollover>,
) -> Result<Json<ApplicationCycle>, AppError> {
    let cycle = service
        .end_cycle_and_start_new(&principal, &body.name)
        .await?;
    Ok(Json(cycle))
}
