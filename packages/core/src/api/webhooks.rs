//! Webhook diagnostics and delivery history.
//!
//! Routes:
//! - `POST /webhooks/test`      : send a sample payload and report the outcome
//! - `GET  /webhooks/deliveries`: delivery log, newest first
//! - `GET|POST /webhooks/examples/:kind`: sample receivers, so the test
//!   action can be pointed back at this service

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use chrono::Utc;
use serde_json::{json, Value};

use super::AppState;
use crate::error::AppError;
use crate::repository::deliveries::{DeliveryFilter, DeliveryRecord};
use crate::webhooks::event::EventKind;
use crate::webhooks::payload::WebhookPayload;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestWebhookRequest {
    pub event_type: Option<String>,
    pub webhook_url: Option<String>,
    pub token: Option<String>,
}

fn failure(status: StatusCode, error: impl Into<String>) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "success": false, "error": error.into() })))
}

/// `POST /webhooks/test`
///
/// The status code reflects the diagnosis: 200 on success, 408 timeout,
/// 404 DNS failure, 503 connection refused, 500 other network errors and
/// 400 for invalid URLs and HTTP error responses.
pub async fn test_webhook(
    State(state): State<AppState>,
    Json(body): Json<TestWebhookRequest>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    let event_type = body
        .event_type
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| failure(StatusCode::BAD_REQUEST, "eventType is required"))?;

    let kind: EventKind = event_type
        .parse()
        .map_err(|err: AppError| failure(StatusCode::BAD_REQUEST, err.to_string()))?;

    let delivery = state
        .webhooks
        .send_test(kind, body.webhook_url.as_deref(), body.token.as_deref())
        .await
        .map_err(|err| failure(err.status_code(), err.to_string()))?
        .ok_or_else(|| failure(StatusCode::BAD_REQUEST, "Webhook URL is not configured"))?;

    let result = delivery.result;
    let status = result.admin_status();

    let payload = if result.success {
        json!({
            "success": true,
            "message": format!("Webhook {} tested successfully", kind),
            "errorKind": result.error_kind,
            "response": result.details,
        })
    } else {
        json!({
            "success": false,
            "error": result.message,
            "errorKind": result.error_kind,
            "suggestion": result.suggestion,
            "details": result.details,
        })
    };

    Ok((status, Json(payload)))
}

#[derive(Debug, Deserialize)]
pub struct DeliveryQuery {
    pub limit: Option<i64>,
    pub event_type: Option<String>,
    pub success: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct DeliveryHistoryResponse {
    pub total: i64,
    pub items: Vec<DeliveryRecord>,
}

/// `GET /webhooks/deliveries`
///
/// Query params:
/// - `limit`     : max items to return (default 20, clamped to 100)
/// - `event_type`: optional filter: stock_alert | sale | daily_summary
/// - `success`   : optional bool filter
pub async fn list_deliveries(
    State(state): State<AppState>,
    Query(params): Query<DeliveryQuery>,
) -> Result<Json<DeliveryHistoryResponse>, AppError> {
    let limit = params.limit.unwrap_or(20).clamp(1, 100);

    if let Some(event_type) = params.event_type.as_deref() {
        event_type.parse::<EventKind>()?;
    }

    let filter = DeliveryFilter {
        event_type: params.event_type,
        success: params.success,
    };

    let repo = state.deliveries();
    let items = repo.query(&filter, limit).await?;
    let total = repo.count(&filter).await?;

    Ok(Json(DeliveryHistoryResponse { total, items }))
}

/// Path slug and description of each built-in sample receiver.
fn example_receiver(slug: &str) -> Option<(EventKind, &'static str)> {
    match slug {
        "stock-alert" => Some((EventKind::StockAlert, "Sample receiver for stock alert webhooks")),
        "sale-completed" => Some((EventKind::Sale, "Sample receiver for completed sale webhooks")),
        "daily-summary" => Some((EventKind::DailySummary, "Sample receiver for daily summary webhooks")),
        _ => None,
    }
}

fn unknown_example(slug: &str) -> AppError {
    AppError::not_found(format!(
        "No example receiver '{}' (expected stock-alert, sale-completed or daily-summary)",
        slug
    ))
}

/// `GET /webhooks/examples/:kind`: describe the receiver and show a sample payload.
pub async fn describe_example(Path(slug): Path<String>) -> Result<Json<Value>, AppError> {
    let (kind, description) = example_receiver(&slug).ok_or_else(|| unknown_example(&slug))?;
    Ok(Json(json!({
        "endpoint": slug,
        "description": description,
        "method": "POST",
        "example_payload": WebhookPayload::test_for(kind, Utc::now()),
    })))
}

/// `POST /webhooks/examples/:kind`: accept any payload and acknowledge it.
pub async fn receive_example(
    Path(slug): Path<String>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let (kind, _) = example_receiver(&slug).ok_or_else(|| unknown_example(&slug))?;
    let event_type = payload.get("event").cloned().unwrap_or(Value::Null);
    let test_mode = payload.get("test").and_then(Value::as_bool).unwrap_or(false);

    tracing::info!(receiver = %slug, event = %event_type, test = test_mode, "Example webhook received");

    Ok(Json(json!({
        "success": true,
        "message": format!("{} webhook processed", kind),
        "received_at": Utc::now().to_rfc3339(),
        "event_type": event_type,
        "test_mode": test_mode,
    })))
}
