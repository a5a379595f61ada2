//! Settings endpoints: the raw key/value map and the typed webhook view.

use std::collections::BTreeMap;

use axum::{extract::State, Json};

use super::AppState;
use crate::error::AppError;
use crate::repository::settings::{validate_setting, WebhookSettings, BASE_URL_KEY};

/// `GET /settings`
pub async fn get_settings(State(state): State<AppState>) -> Result<Json<BTreeMap<String, String>>, AppError> {
    Ok(Json(state.settings().get_all().await?))
}

/// `PUT /settings`: upsert every pair in the body. Webhook URL keys are
/// validated first; nothing is written if any of them is malformed.
pub async fn put_settings(
    State(state): State<AppState>,
    Json(body): Json<BTreeMap<String, String>>,
) -> Result<Json<BTreeMap<String, String>>, AppError> {
    let repo = state.settings();

    let base_url = match body.get(BASE_URL_KEY) {
        Some(base) => base.clone(),
        None => repo.get(BASE_URL_KEY).await?.unwrap_or_default(),
    };
    for (key, value) in &body {
        validate_setting(key, value, &base_url)?;
    }

    repo.upsert_many(&body).await?;
    tracing::info!(keys = body.len(), "Settings updated");

    Ok(Json(repo.get_all().await?))
}

/// `GET /settings/webhooks`
pub async fn get_webhook_settings(State(state): State<AppState>) -> Result<Json<WebhookSettings>, AppError> {
    Ok(Json(state.settings().load_webhooks().await?))
}

/// `PUT /settings/webhooks`
pub async fn put_webhook_settings(
    State(state): State<AppState>,
    Json(body): Json<WebhookSettings>,
) -> Result<Json<WebhookSettings>, AppError> {
    let repo = state.settings();
    repo.save_webhooks(&body).await?;
    tracing::info!("Webhook settings updated");

    Ok(Json(repo.load_webhooks().await?))
}
