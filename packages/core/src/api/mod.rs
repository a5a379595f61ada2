//! HTTP API.
//!
//! Routes:
//! - `GET  /health`, `GET /metrics`
//! - `GET|PUT /settings`, `GET|PUT /settings/webhooks`
//! - `POST /webhooks/test`, `GET /webhooks/deliveries`
//! - `GET|POST /webhooks/examples/:kind` (built-in sample receivers)
//! - `GET|POST /products`, `GET /products/low-stock`, `GET|PUT|DELETE /products/:id`
//! - `GET|POST /stock/movements`, `POST /stock/bulk`
//! - `GET|POST /sales`, `GET /sales/:id`, `POST /notifications/daily-summary`

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use sqlx::SqlitePool;

use crate::checkout::Checkout;
use crate::metrics::AppMetrics;
use crate::repository::{DeliveryRepository, InventoryRepository, SalesRepository, SettingsRepository};
use crate::summary::DailySummaryJob;
use crate::webhooks::notifier::{Notifier, WebhookNotifier};

pub mod health;
pub mod inventory;
pub mod sales;
pub mod settings;
pub mod webhooks;

/// Shared state for every route.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub checkout: Arc<Checkout>,
    pub summary: Arc<DailySummaryJob>,
    /// Direct, synchronous delivery. Used by the diagnostic test action.
    pub webhooks: Arc<WebhookNotifier>,
    pub metrics: Arc<AppMetrics>,
}

impl AppState {
    /// `notifier` receives business events; in production it is the queue.
    pub fn new(
        pool: SqlitePool,
        notifier: Arc<dyn Notifier>,
        webhooks: Arc<WebhookNotifier>,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self {
            checkout: Arc::new(Checkout::new(pool.clone(), notifier.clone(), metrics.clone())),
            summary: Arc::new(DailySummaryJob::new(pool.clone(), notifier)),
            pool,
            webhooks,
            metrics,
        }
    }

    pub fn settings(&self) -> SettingsRepository {
        SettingsRepository::new(self.pool.clone())
    }

    pub fn inventory(&self) -> InventoryRepository {
        InventoryRepository::new(self.pool.clone())
    }

    pub fn sales(&self) -> SalesRepository {
        SalesRepository::new(self.pool.clone())
    }

    pub fn deliveries(&self) -> DeliveryRepository {
        DeliveryRepository::new(self.pool.clone())
    }
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            Body::from(body),
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Failed to render metrics: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, "error").into_response()
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/metrics", get(metrics_handler))
        .route("/settings", get(settings::get_settings).put(settings::put_settings))
        .route(
            "/settings/webhooks",
            get(settings::get_webhook_settings).put(settings::put_webhook_settings),
        )
        .route("/webhooks/test", post(webhooks::test_webhook))
        .route("/webhooks/deliveries", get(webhooks::list_deliveries))
        .route(
            "/webhooks/examples/:kind",
            get(webhooks::describe_example).post(webhooks::receive_example),
        )
        .route(
            "/products",
            get(inventory::list_products).post(inventory::create_product),
        )
        .route("/products/low-stock", get(inventory::low_stock))
        .route(
            "/products/:id",
            get(inventory::get_product)
                .put(inventory::update_product)
                .delete(inventory::deactivate_product),
        )
        .route(
            "/stock/movements",
            get(inventory::list_movements).post(inventory::create_movement),
        )
        .route("/stock/bulk", post(inventory::bulk_adjust))
        .route("/sales", get(sales::list_sales).post(sales::create_sale))
        .route("/sales/:id", get(sales::get_sale))
        .route("/notifications/daily-summary", post(sales::send_daily_summary))
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use axum::http::{Method, Request};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::db::create_pool;
    use crate::webhooks::dispatcher::WebhookDispatcher;
    use crate::webhooks::notifier::testing::RecordingNotifier;
    use crate::webhooks::resolver::{EndpointResolver, EnvWebhookDefaults};

    pub struct TestApp {
        pub router: Router,
        pub state: AppState,
        pub recorder: Arc<RecordingNotifier>,
    }

    /// Router over an in-memory database. Business events land in `recorder`.
    pub async fn test_app() -> TestApp {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        let metrics = Arc::new(AppMetrics::new().unwrap());
        let resolver = Arc::new(EndpointResolver::new(pool.clone(), EnvWebhookDefaults::default()));
        let webhooks = Arc::new(WebhookNotifier::new(
            WebhookDispatcher::new().unwrap(),
            resolver,
            pool.clone(),
            metrics.clone(),
        ));
        let recorder = Arc::new(RecordingNotifier::default());
        let state = AppState::new(pool, recorder.clone(), webhooks, metrics);

        TestApp {
            router: build_router(state.clone()),
            state,
            recorder,
        }
    }

    /// Send one request and decode the JSON body (`Null` if empty or not JSON).
    pub async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }
}
