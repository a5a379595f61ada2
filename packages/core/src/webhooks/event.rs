//! Notification event kinds and the domain events carried by webhooks.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// The three notification types this service emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    StockAlert,
    Sale,
    DailySummary,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [EventKind::StockAlert, EventKind::Sale, EventKind::DailySummary];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::StockAlert => "stock_alert",
            EventKind::Sale => "sale",
            EventKind::DailySummary => "daily_summary",
        }
    }

    /// Settings key holding the destination URL for this kind.
    pub fn url_key(&self) -> &'static str {
        match self {
            EventKind::StockAlert => "stock_alert_webhook",
            EventKind::Sale => "sale_webhook",
            EventKind::DailySummary => "daily_summary_webhook",
        }
    }

    /// Settings key holding the active flag for this kind.
    pub fn active_key(&self) -> &'static str {
        match self {
            EventKind::StockAlert => "stock_alert_webhook_active",
            EventKind::Sale => "sale_webhook_active",
            EventKind::DailySummary => "daily_summary_webhook_active",
        }
    }

    /// Environment variable used as a fallback destination.
    pub fn env_var(&self) -> &'static str {
        match self {
            EventKind::StockAlert => "N8N_STOCK_ALERT_WEBHOOK",
            EventKind::Sale => "N8N_SALE_WEBHOOK",
            EventKind::DailySummary => "N8N_DAILY_SUMMARY_WEBHOOK",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stock_alert" => Ok(EventKind::StockAlert),
            "sale" => Ok(EventKind::Sale),
            "daily_summary" => Ok(EventKind::DailySummary),
            other => Err(AppError::validation(format!(
                "Unknown event type '{}'. Must be one of: stock_alert, sale, daily_summary",
                other
            ))),
        }
    }
}

/// Severity label attached to stock alerts. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Critical,
    High,
    Medium,
}

impl Urgency {
    /// `critical` when out of stock, `high` at or below half the minimum,
    /// `medium` otherwise.
    pub fn classify(current_stock: i64, min_stock: i64) -> Self {
        if current_stock == 0 {
            Urgency::Critical
        } else if current_stock as f64 <= min_stock as f64 * 0.5 {
            Urgency::High
        } else {
            Urgency::Medium
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Critical => "critical",
            Urgency::High => "high",
            Urgency::Medium => "medium",
        }
    }
}

/// A product at or below its minimum stock level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LowStockProduct {
    pub name: String,
    pub stock_quantity: i64,
    pub min_stock_level: i64,
}

/// A business event that should be pushed to the automation tool.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationEvent {
    StockAlert {
        product_id: i64,
        product_name: String,
        current_stock: i64,
        min_stock: i64,
        urgency: Urgency,
    },
    SaleCompleted {
        sale_id: i64,
        sale_number: String,
        total_amount: f64,
        item_count: usize,
    },
    DailySummary {
        date: NaiveDate,
        revenue: f64,
        sales_count: i64,
        items_sold: i64,
        revenue_change_pct: f64,
        low_stock_products: Vec<LowStockProduct>,
    },
}

impl NotificationEvent {
    /// Build a stock alert, deriving the urgency from the stock levels.
    pub fn stock_alert(product_id: i64, product_name: impl Into<String>, current_stock: i64, min_stock: i64) -> Self {
        NotificationEvent::StockAlert {
            product_id,
            product_name: product_name.into(),
            current_stock,
            min_stock,
            urgency: Urgency::classify(current_stock, min_stock),
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            NotificationEvent::StockAlert { .. } => EventKind::StockAlert,
            NotificationEvent::SaleCompleted { .. } => EventKind::Sale,
            NotificationEvent::DailySummary { .. } => EventKind::DailySummary,
        }
    }
}

/// Percentage revenue change vs. the previous day.
///
/// Returns `0.0` when yesterday had no revenue, so the result is always finite.
pub fn revenue_change_pct(today: f64, yesterday: f64) -> f64 {
    if yesterday > 0.0 {
        (today - yesterday) / yesterday * 100.0
    } else {
        0.0
    }
}
