//! Product and stock ledger endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use super::AppState;
use crate::error::AppError;
use crate::repository::inventory::{
    BulkStockAdjustment, MovementType, NewProduct, Product, ProductUpdate, StockChange, StockMovement,
};
use crate::webhooks::event::LowStockProduct;

/// `POST /products`
pub async fn create_product(
    State(state): State<AppState>,
    Json(body): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    let product = state.inventory().create_product(&body).await?;
    tracing::info!(product_id = product.id, name = %product.name, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// `GET /products`
pub async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<Product>>, AppError> {
    Ok(Json(state.inventory().list_products().await?))
}

/// `GET /products/low-stock`
pub async fn low_stock(State(state): State<AppState>) -> Result<Json<Vec<LowStockProduct>>, AppError> {
    Ok(Json(state.inventory().low_stock_products().await?))
}

/// `GET /products/:id`
pub async fn get_product(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Product>, AppError> {
    state
        .inventory()
        .get_product(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("Product {} not found", id)))
}

/// `PUT /products/:id`: replace the product. A stock change is logged to the ledger.
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<ProductUpdate>,
) -> Result<Json<Product>, AppError> {
    let product = state.inventory().update_product(id, &body).await?;
    tracing::info!(product_id = id, stock = product.stock_quantity, "Product updated");
    Ok(Json(product))
}

/// `DELETE /products/:id`: deactivate. Ledger and sales history are kept.
pub async fn deactivate_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Product>, AppError> {
    let product = state.inventory().deactivate_product(id).await?;
    tracing::info!(product_id = id, name = %product.name, "Product deactivated");
    Ok(Json(product))
}

#[derive(Debug, Deserialize)]
pub struct MovementRequest {
    pub product_id: i64,
    pub movement_type: MovementType,
    pub quantity: i64,
    pub reason: String,
    #[serde(default)]
    pub reference_id: Option<String>,
}

/// `POST /stock/movements`: manual stock entry, exit or count.
pub async fn create_movement(
    State(state): State<AppState>,
    Json(body): Json<MovementRequest>,
) -> Result<(StatusCode, Json<StockChange>), AppError> {
    if body.reason.trim().is_empty() {
        return Err(AppError::validation("Movement reason is required"));
    }

    let change = state
        .inventory()
        .apply_movement(
            body.product_id,
            body.movement_type,
            body.quantity,
            body.reason.trim(),
            body.reference_id.as_deref(),
        )
        .await?;

    tracing::info!(
        product_id = change.product_id,
        movement = %body.movement_type,
        previous = change.previous,
        current = change.current,
        "Stock movement recorded"
    );
    Ok((StatusCode::CREATED, Json(change)))
}

#[derive(Debug, Deserialize)]
pub struct MovementQuery {
    pub product_id: Option<i64>,
    pub limit: Option<i64>,
}

/// `GET /stock/movements?product_id&limit`: newest first (default 50, max 100).
pub async fn list_movements(
    State(state): State<AppState>,
    Query(params): Query<MovementQuery>,
) -> Result<Json<Vec<StockMovement>>, AppError> {
    let movements = state
        .inventory()
        .list_movements(params.product_id, params.limit.unwrap_or(50))
        .await?;
    Ok(Json(movements))
}

#[derive(Debug, Deserialize)]
pub struct BulkRequest {
    pub product_ids: Vec<i64>,
    #[serde(flatten)]
    pub adjustment: BulkStockAdjustment,
}

/// `POST /stock/bulk`: `{ product_ids, type: set|add|subtract, quantity }`.
pub async fn bulk_adjust(
    State(state): State<AppState>,
    Json(body): Json<BulkRequest>,
) -> Result<Json<Vec<StockChange>>, AppError> {
    let changes = state
        .inventory()
        .bulk_adjust(&body.product_ids, body.adjustment)
        .await?;
    tracing::info!(products = changes.len(), "Bulk stock adjustment applied");
    Ok(Json(changes))
}
