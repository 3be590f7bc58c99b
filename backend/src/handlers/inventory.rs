//! HTTP handlers for stock ledger endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use shared::models::Role;

use crate::error::AppResult;
use crate::middleware::{require_role, CurrentUser};
use crate::services::inventory::{InventoryService, RecordTransactionInput, StockTransaction};
use crate::AppState;

/// Record a stock transaction
pub async fn record_transaction(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<RecordTransactionInput>,
) -> AppResult<Json<StockTransaction>> {
    require_role(&current_user.0, &[Role::Admin, Role::InventoryManager])?;
    let service = InventoryService::new(state.db, state.events);
    let transaction = service
        .record_transaction(current_user.0.user_id, input)
        .await?;
    Ok(Json(transaction))
}

/// List the full stock ledger
pub async fn list_transactions(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<StockTransaction>>> {
    let service = InventoryService::new(state.db, state.events);
    let transactions = service.list_transactions().await?;
    Ok(Json(transactions))
}

/// Get transactions for a product
pub async fn get_product_transactions(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Vec<StockTransaction>>> {
    let service = InventoryService::new(state.db, state.events);
    let transactions = service.get_transactions(product_id).await?;
    Ok(Json(transactions))
}
