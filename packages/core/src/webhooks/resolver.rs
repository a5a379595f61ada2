//! Where does an event of a given kind go?
//!
//! Stored settings win over the process environment. A kind whose
//! `<kind>_webhook_active` setting is `false` resolves to nothing, even
//! when the environment names a URL for it.

use std::env;

use sqlx::SqlitePool;

use super::event::EventKind;
use crate::repository::settings::{join_base, SettingsRepository, BASE_URL_KEY};

/// Webhook fallbacks taken from the environment at startup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvWebhookDefaults {
    pub stock_alert: Option<String>,
    pub sale: Option<String>,
    pub daily_summary: Option<String>,
    pub token: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl EnvWebhookDefaults {
    pub fn from_env() -> Self {
        let read = |name: &str| non_blank(env::var(name).ok());
        Self {
            stock_alert: read(EventKind::StockAlert.env_var()),
            sale: read(EventKind::Sale.env_var()),
            daily_summary: read(EventKind::DailySummary.env_var()),
            token: read("N8N_WEBHOOK_TOKEN"),
        }
    }

    pub fn url_for(&self, kind: EventKind) -> Option<&str> {
        match kind {
            EventKind::StockAlert => self.stock_alert.as_deref(),
            EventKind::Sale => self.sale.as_deref(),
            EventKind::DailySummary => self.daily_summary.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEndpoint {
    pub url: String,
    pub token: Option<String>,
}

pub struct EndpointResolver {
    settings: SettingsRepository,
    defaults: EnvWebhookDefaults,
}

impl EndpointResolver {
    pub fn new(pool: SqlitePool, defaults: EnvWebhookDefaults) -> Self {
        Self {
            settings: SettingsRepository::new(pool),
            defaults,
        }
    }

    /// Destination and token for `kind`, or `None` if nothing is configured
    /// or the kind is switched off.
    pub async fn resolve(&self, kind: EventKind) -> Result<Option<ResolvedEndpoint>, sqlx::Error> {
        let stored = self.settings.load_webhooks().await?;
        if !stored.is_active(kind) {
            return Ok(None);
        }

        let url = stored
            .resolved_url(kind)
            .or_else(|| self.defaults.url_for(kind).map(str::to_string));
        let token = stored
            .token()
            .map(str::to_string)
            .or_else(|| self.defaults.token.clone());

        Ok(url.map(|url| ResolvedEndpoint { url, token }))
    }

    /// Expand an operator-supplied URL the same way stored ones are: a
    /// relative `/path` is joined onto the stored base URL.
    pub async fn expand_url(&self, url: &str) -> Result<String, sqlx::Error> {
        let base_url = self.settings.get(BASE_URL_KEY).await?.unwrap_or_default();
        Ok(join_base(url, &base_url).unwrap_or_default())
    }

    /// Shared token: stored value first, then the environment.
    pub async fn token(&self) -> Result<Option<String>, sqlx::Error> {
        let stored = self.settings.load_webhooks().await?;
        Ok(stored
            .token()
            .map(str::to_string)
            .or_else(|| self.defaults.token.clone()))
    }
}
