//! Key/value settings store and the typed webhook view over it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

use crate::error::AppError;
use crate::webhooks::dispatcher::validate_url;
use crate::webhooks::event::EventKind;

pub const TOKEN_KEY: &str = "n8n_webhook_token";
pub const BASE_URL_KEY: &str = "n8n_base_url";

/// Repository for the flat `settings` table.
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_all(&self) -> Result<BTreeMap<String, String>, sqlx::Error> {
        let rows = sqlx::query("SELECT key, value FROM settings ORDER BY key")
            .fetch_all(&self.pool)
            .await?;

        let settings = rows
            .into_iter()
            .filter_map(|row| {
                let key: String = row.try_get("key").ok()?;
                let value: String = row.try_get("value").ok()?;
                Some((key, value))
            })
            .collect();

        Ok(settings)
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, sqlx::Error> {
        let row = sqlx::query("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.and_then(|row| row.try_get("value").ok()))
    }

    /// Insert or overwrite every pair in one transaction.
    pub async fn upsert_many(&self, values: &BTreeMap<String, String>) -> Result<(), sqlx::Error> {
        if values.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for (key, value) in values {
            sqlx::query(
                "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, datetime('now'))
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            )
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn load_webhooks(&self) -> Result<WebhookSettings, sqlx::Error> {
        Ok(WebhookSettings::from_map(&self.get_all().await?))
    }

    pub async fn save_webhooks(&self, settings: &WebhookSettings) -> Result<(), AppError> {
        settings.validate()?;
        self.upsert_many(&settings.to_map()).await?;
        Ok(())
    }
}

fn default_active() -> bool {
    true
}

/// Typed view of the webhook-related settings keys.
///
/// Blank URLs mean "not configured". Kinds are active unless their
/// `<kind>_webhook_active` key is explicitly `false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookSettings {
    #[serde(default)]
    pub n8n_base_url: String,
    #[serde(default)]
    pub n8n_webhook_token: String,
    #[serde(default)]
    pub stock_alert_webhook: String,
    #[serde(default)]
    pub sale_webhook: String,
    #[serde(default)]
    pub daily_summary_webhook: String,
    #[serde(default = "default_active")]
    pub stock_alert_webhook_active: bool,
    #[serde(default = "default_active")]
    pub sale_webhook_active: bool,
    #[serde(default = "default_active")]
    pub daily_summary_webhook_active: bool,
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            n8n_base_url: String::new(),
            n8n_webhook_token: String::new(),
            stock_alert_webhook: String::new(),
            sale_webhook: String::new(),
            daily_summary_webhook: String::new(),
            stock_alert_webhook_active: true,
            sale_webhook_active: true,
            daily_summary_webhook_active: true,
        }
    }
}

impl WebhookSettings {
    pub fn from_map(map: &BTreeMap<String, String>) -> Self {
        let text = |key: &str| map.get(key).map(|v| v.trim().to_string()).unwrap_or_default();
        let flag = |key: &str| map.get(key).map_or(true, |v| v.trim() != "false");

        Self {
            n8n_base_url: text(BASE_URL_KEY),
            n8n_webhook_token: text(TOKEN_KEY),
            stock_alert_webhook: text(EventKind::StockAlert.url_key()),
            sale_webhook: text(EventKind::Sale.url_key()),
            daily_summary_webhook: text(EventKind::DailySummary.url_key()),
            stock_alert_webhook_active: flag(EventKind::StockAlert.active_key()),
            sale_webhook_active: flag(EventKind::Sale.active_key()),
            daily_summary_webhook_active: flag(EventKind::DailySummary.active_key()),
        }
    }

    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert(BASE_URL_KEY.to_string(), self.n8n_base_url.trim().to_string());
        map.insert(TOKEN_KEY.to_string(), self.n8n_webhook_token.trim().to_string());
        for kind in EventKind::ALL {
            map.insert(kind.url_key().to_string(), self.url_for(kind).trim().to_string());
            map.insert(kind.active_key().to_string(), self.is_active(kind).to_string());
        }
        map
    }

    pub fn url_for(&self, kind: EventKind) -> &str {
        match kind {
            EventKind::StockAlert => &self.stock_alert_webhook,
            EventKind::Sale => &self.sale_webhook,
            EventKind::DailySummary => &self.daily_summary_webhook,
        }
    }

    pub fn is_active(&self, kind: EventKind) -> bool {
        match kind {
            EventKind::StockAlert => self.stock_alert_webhook_active,
            EventKind::Sale => self.sale_webhook_active,
            EventKind::DailySummary => self.daily_summary_webhook_active,
        }
    }

    /// Shared token, if one is stored.
    pub fn token(&self) -> Option<&str> {
        Some(self.n8n_webhook_token.trim()).filter(|t| !t.is_empty())
    }

    /// Absolute destination for `kind`, joining relative paths onto the base URL.
    pub fn resolved_url(&self, kind: EventKind) -> Option<String> {
        join_base(self.url_for(kind), &self.n8n_base_url)
    }

    /// Syntax-only validation. Reachability is checked by the test action.
    pub fn validate(&self) -> Result<(), AppError> {
        validate_setting(BASE_URL_KEY, &self.n8n_base_url, "")?;
        for kind in EventKind::ALL {
            validate_setting(kind.url_key(), self.url_for(kind), &self.n8n_base_url)?;
        }
        Ok(())
    }
}

/// Validate one raw settings value if `key` is a URL-bearing key.
pub fn validate_setting(key: &str, value: &str, base_url: &str) -> Result<(), AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(());
    }

    let is_webhook_key = EventKind::ALL.iter().any(|kind| kind.url_key() == key);
    if key == BASE_URL_KEY {
        validate_url(value).map_err(|reason| AppError::validation(format!("{}: {}", key, reason)))?;
    } else if is_webhook_key {
        let absolute = join_base(value, base_url).unwrap_or_default();
        validate_url(&absolute).map_err(|reason| AppError::validation(format!("{}: {}", key, reason)))?;
    }
    Ok(())
}

/// Resolve a relative `/path` against `base_url`; absolute values pass through.
pub(crate) fn join_base(stored: &str, base_url: &str) -> Option<String> {
    let stored = stored.trim();
    if stored.is_empty() {
        return None;
    }
    let base = base_url.trim();
    if stored.starts_with('/') && !base.is_empty() {
        Some(format!("{}{}", base.trim_end_matches('/'), stored))
    } else {
        Some(stored.to_string())
    }
}
