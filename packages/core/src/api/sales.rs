//! Checkout and summary endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::AppState;
use crate::checkout::CheckoutReceipt;
use crate::error::AppError;
use crate::repository::sales::{NewSale, Sale, SaleItem};

/// `POST /sales`: record a sale, decrement stock and queue notifications.
pub async fn create_sale(
    State(state): State<AppState>,
    Json(body): Json<NewSale>,
) -> Result<(StatusCode, Json<CheckoutReceipt>), AppError> {
    let receipt = state.checkout.process(body).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

#[derive(Debug, Serialize)]
pub struct SaleDetail {
    #[serde(flatten)]
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

#[derive(Debug, Deserialize)]
pub struct SalesQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

/// `GET /sales?status&limit`: newest first with line items (default 50, max 100).
pub async fn list_sales(
    State(state): State<AppState>,
    Query(params): Query<SalesQuery>,
) -> Result<Json<Vec<SaleDetail>>, AppError> {
    let repo = state.sales();
    let sales = repo
        .list_sales(params.status.as_deref(), params.limit.unwrap_or(50))
        .await?;

    let mut details = Vec::with_capacity(sales.len());
    for sale in sales {
        let items = repo.list_items(sale.id).await?;
        details.push(SaleDetail { sale, items });
    }
    Ok(Json(details))
}

/// `GET /sales/:id`
pub async fn get_sale(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<SaleDetail>, AppError> {
    let repo = state.sales();
    let sale = repo
        .get_sale(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Sale {} not found", id)))?;
    let items = repo.list_items(id).await?;
    Ok(Json(SaleDetail { sale, items }))
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    /// `YYYY-MM-DD`; defaults to today (UTC).
    pub date: Option<NaiveDate>,
}

/// `POST /notifications/daily-summary[?date=YYYY-MM-DD]`
pub async fn send_daily_summary(
    State(state): State<AppState>,
    Query(params): Query<SummaryQuery>,
) -> Result<Json<Value>, AppError> {
    let date = params.date.unwrap_or_else(|| Utc::now().date_naive());
    let message = state.summary.run(date).await?;
    Ok(Json(json!({ "success": true, "date": date, "message": message })))
}
