//! HTTP handlers for alert endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use shared::models::Role;

use crate::error::AppResult;
use crate::middleware::{require_role, CurrentUser};
use crate::services::alerts::{AlertService, AlertWithProduct, ListAlertsQuery, SweepSummary};
use crate::AppState;

/// List alerts with their product projections
pub async fn list_alerts(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ListAlertsQuery>,
) -> AppResult<Json<Vec<AlertWithProduct>>> {
    let service = AlertService::new(state.db, state.events);
    let alerts = service.list_alerts(query).await?;
    Ok(Json(alerts))
}

/// Run a full-catalogue alert sweep now
pub async fn run_sweep(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<SweepSummary>> {
    require_role(&current_user.0, &[Role::Admin, Role::InventoryManager])?;
    let service = AlertService::new(state.db, state.events);
    let summary = service.sweep_all().await?;
    Ok(Json(summary))
}

/// Mark an alert as read
pub async fn mark_read(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(alert_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = AlertService::new(state.db, state.events);
    service.mark_read(alert_id).await?;
    Ok(Json(()))
}

/// Response for bulk read marking
#[derive(Debug, Serialize)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

/// Mark every alert as read
pub async fn mark_all_read(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<MarkAllReadResponse>> {
    let service = AlertService::new(state.db, state.events);
    let updated = service.mark_all_read().await?;
    Ok(Json(MarkAllReadResponse { updated }))
}

/// Delete an alert
pub async fn delete_alert(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(alert_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    require_role(&current_user.0, &[Role::Admin, Role::InventoryManager])?;
    let service = AlertService::new(state.db, state.events);
    service.delete_alert(alert_id).await?;
    Ok(Json(()))
}
