//! HTTP handlers for product catalogue endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use shared::models::Role;

use crate::error::AppResult;
use crate::middleware::{require_role, CurrentUser};
use crate::services::products::{
    CreateProductInput, ListProductsQuery, ProductService, ProductWithStatus, UpdateProductInput,
};
use crate::AppState;

/// Create a catalogue product
pub async fn create_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateProductInput>,
) -> AppResult<Json<ProductWithStatus>> {
    require_role(&current_user.0, &[Role::Admin, Role::InventoryManager])?;
    let service = ProductService::new(state.db, state.events);
    let product = service.create_product(input).await?;
    Ok(Json(product))
}

/// List products with derived status
pub async fn list_products(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ListProductsQuery>,
) -> AppResult<Json<Vec<ProductWithStatus>>> {
    let service = ProductService::new(state.db, state.events);
    let products = service.list_products(query).await?;
    Ok(Json(products))
}

/// Get a product with derived status
pub async fn get_product(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ProductWithStatus>> {
    let service = ProductService::new(state.db, state.events);
    let product = service.get_product(product_id).await?;
    Ok(Json(product))
}

/// Update a product
pub async fn update_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
    Json(input): Json<UpdateProductInput>,
) -> AppResult<Json<ProductWithStatus>> {
    require_role(&current_user.0, &[Role::Admin, Role::InventoryManager])?;
    let service = ProductService::new(state.db, state.events);
    let product = service.update_product(product_id, input).await?;
    Ok(Json(product))
}

/// Delete a product
pub async fn delete_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    require_role(&current_user.0, &[Role::Admin])?;
    let service = ProductService::new(state.db, state.events);
    service.delete_product(product_id).await?;
    Ok(Json(()))
}
