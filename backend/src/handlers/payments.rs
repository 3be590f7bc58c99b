//! HTTP handlers for supplier payment endpoints

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};

use shared::models::{Role, SupplierPayment};

use crate::error::{AppError, AppResult};
use crate::middleware::{require_role, CurrentUser};
use crate::services::payments::{
    ConfirmPaymentInput, ConfirmResponse, CreateCollectionInput, ListCollectionsQuery,
    PaymentService, PaymentTransactionEntry, QrResponse,
};
use crate::AppState;

/// Register a supplier's weighed delivery
pub async fn create_collection(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateCollectionInput>,
) -> AppResult<Json<SupplierPayment>> {
    require_role(&current_user.0, &[Role::Collector, Role::Admin])?;
    let service = PaymentService::new(state.db, state.events, &state.config);
    let payment = service
        .create_collection(current_user.0.user_id, input)
        .await?;
    Ok(Json(payment))
}

/// List collections, scoped by role: suppliers see their own deliveries,
/// collectors the ones they recorded, staff everything
pub async fn list_collections(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(mut query): Query<ListCollectionsQuery>,
) -> AppResult<Json<Vec<SupplierPayment>>> {
    match current_user.0.role {
        Role::Supplier => query.supplier_id = Some(current_user.0.user_id),
        Role::Collector => query.collector_id = Some(current_user.0.user_id),
        Role::Admin | Role::InventoryManager => {}
    }

    let service = PaymentService::new(state.db, state.events, &state.config);
    let payments = service.list_collections(query).await?;
    Ok(Json(payments))
}

/// Get a collection by transaction id
pub async fn get_collection(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transaction_id): Path<String>,
) -> AppResult<Json<SupplierPayment>> {
    let service = PaymentService::new(state.db, state.events, &state.config);
    let payment = service.get_collection(&transaction_id).await?;

    if current_user.0.role == Role::Supplier && payment.supplier_id != current_user.0.user_id {
        return Err(AppError::Forbidden(
            "This payment belongs to a different supplier".to_string(),
        ));
    }

    Ok(Json(payment))
}

/// Mint a QR proof for a collection
pub async fn generate_qr(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transaction_id): Path<String>,
) -> AppResult<Json<QrResponse>> {
    require_role(&current_user.0, &[Role::Collector, Role::Admin])?;
    let service = PaymentService::new(state.db, state.events, &state.config);
    let qr = service.generate_qr(&transaction_id).await?;
    Ok(Json(qr))
}

/// Confirm a payment as the owning supplier
pub async fn confirm_payment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<ConfirmPaymentInput>,
) -> AppResult<Json<ConfirmResponse>> {
    require_role(&current_user.0, &[Role::Supplier])?;
    let service = PaymentService::new(state.db, state.events, &state.config);
    let response = service
        .confirm_payment(current_user.0.user_id, input)
        .await?;
    Ok(Json(response))
}

/// Reconciliation report from the mirror table
pub async fn reconciliation_report(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<PaymentTransactionEntry>>> {
    require_role(&current_user.0, &[Role::Admin])?;
    let service = PaymentService::new(state.db, state.events, &state.config);
    let entries = service.reconciliation_report().await?;
    Ok(Json(entries))
}

/// Reconciliation report as a CSV download
pub async fn reconciliation_report_csv(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<impl IntoResponse> {
    require_role(&current_user.0, &[Role::Admin])?;
    let service = PaymentService::new(state.db, state.events, &state.config);
    let entries = service.reconciliation_report().await?;
    let csv_data = PaymentService::export_to_csv(&entries)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"payment-reconciliation.csv\"",
            ),
        ],
        csv_data,
    ))
}
