//! Webhook payload envelope.
//!
//! Every outbound notification uses the same envelope:
//! `{ event, test, timestamp, data, message }`. Only the shape of `data`
//! differs between event kinds.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::event::{EventKind, LowStockProduct, NotificationEvent};

/// Number of low-stock products listed by name in the daily summary.
pub const SUMMARY_LOW_STOCK_LIMIT: usize = 5;

/// Source label sent with diagnostic payloads.
pub const SOURCE_NAME: &str = "Storefront";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub event: EventKind,
    pub test: bool,
    /// RFC 3339 UTC timestamp.
    pub timestamp: String,
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl WebhookPayload {
    /// Build the envelope for a production event.
    pub fn from_event(event: &NotificationEvent, test: bool, now: DateTime<Utc>) -> Self {
        let message = render_message(event, now);
        let mut data = event_data(event);
        data.insert("message".to_string(), Value::String(message.clone()));

        Self {
            event: event.kind(),
            test,
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            data: Value::Object(data),
            message: Some(message),
        }
    }

    /// Build a diagnostic payload with sample data for `kind`.
    pub fn test_for(kind: EventKind, now: DateTime<Utc>) -> Self {
        let message = format!("Webhook test for event: {}", kind);
        let mut data = Map::new();
        data.insert("message".into(), Value::String(message.clone()));
        data.insert("source".into(), Value::String(SOURCE_NAME.into()));
        data.insert("environment".into(), Value::String("test".into()));
        data.insert("event_type".into(), Value::String(kind.as_str().into()));
        data.insert(
            "test_id".into(),
            Value::String(format!("test_{}", now.timestamp_millis())),
        );

        match kind {
            EventKind::StockAlert => {
                data.insert(
                    "product".into(),
                    json!({
                        "id": "test_product_123",
                        "name": "Test Product",
                        "current_stock": 5,
                        "min_stock": 10,
                    }),
                );
            }
            EventKind::Sale => {
                data.insert(
                    "sale".into(),
                    json!({
                        "id": "test_sale_456",
                        "total": 150.75,
                        "items_count": 3,
                        "payment_method": "credit_card",
                    }),
                );
            }
            EventKind::DailySummary => {
                data.insert(
                    "summary".into(),
                    json!({
                        "date": now.date_naive().to_string(),
                        "total_sales": 2450.3,
                        "sales_count": 15,
                        "top_products": ["Product A", "Product B", "Product C"],
                    }),
                );
            }
        }

        Self {
            event: kind,
            test: true,
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            data: Value::Object(data),
            message: Some(message),
        }
    }
}

fn event_data(event: &NotificationEvent) -> Map<String, Value> {
    let value = match event {
        NotificationEvent::StockAlert {
            product_id,
            product_name,
            current_stock,
            min_stock,
            urgency,
        } => json!({
            "product_id": product_id,
            "product_name": product_name,
            "current_stock": current_stock,
            "min_stock": min_stock,
            "urgency": urgency,
        }),
        NotificationEvent::SaleCompleted {
            sale_id,
            sale_number,
            total_amount,
            item_count,
        } => json!({
            "sale_id": sale_id,
            "sale_number": sale_number,
            "total_amount": total_amount,
            "item_count": item_count,
        }),
        NotificationEvent::DailySummary {
            date,
            revenue,
            sales_count,
            items_sold,
            revenue_change_pct,
            low_stock_products,
        } => json!({
            "date": date.to_string(),
            "revenue": revenue,
            "sales_count": sales_count,
            "items_sold": items_sold,
            "revenue_change_pct": revenue_change_pct,
            "low_stock_products": low_stock_products,
        }),
    };

    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn render_message(event: &NotificationEvent, now: DateTime<Utc>) -> String {
    match event {
        NotificationEvent::StockAlert {
            product_name,
            current_stock,
            min_stock,
            urgency,
            ..
        } => format!(
            "LOW STOCK ALERT\n\n\
             Product: {}\n\
             Current stock: {}\n\
             Minimum stock: {}\n\
             Urgency: {}\n\n\
             Stock needs to be replenished.",
            product_name,
            current_stock,
            min_stock,
            urgency.as_str()
        ),
        NotificationEvent::SaleCompleted {
            sale_number,
            total_amount,
            item_count,
            ..
        } => format!(
            "NEW SALE COMPLETED\n\n\
             Order: {}\n\
             Amount: {:.2}\n\
             Items: {}\n\
             Time: {}",
            sale_number,
            total_amount,
            item_count,
            now.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        NotificationEvent::DailySummary {
            date,
            revenue,
            sales_count,
            items_sold,
            revenue_change_pct,
            low_stock_products,
        } => daily_summary_message(
            &date.to_string(),
            *revenue,
            *sales_count,
            *items_sold,
            *revenue_change_pct,
            low_stock_products,
            now,
        ),
    }
}

fn daily_summary_message(
    date: &str,
    revenue: f64,
    sales_count: i64,
    items_sold: i64,
    change_pct: f64,
    low_stock: &[LowStockProduct],
    now: DateTime<Utc>,
) -> String {
    let change = if change_pct > 0.0 {
        format!("+{:.1}%", change_pct)
    } else {
        format!("{:.1}%", change_pct)
    };

    let mut message = format!(
        "DAILY SUMMARY - {}\n\n\
         Revenue: {:.2}\n\
         Sales: {}\n\
         Items sold: {}\n\
         Change: {} vs yesterday\n\n",
        date, revenue, sales_count, items_sold, change
    );

    if low_stock.is_empty() {
        message.push_str("All products are adequately stocked\n");
    } else {
        message.push_str(&format!("LOW STOCK PRODUCTS ({}):\n", low_stock.len()));
        for product in low_stock.iter().take(SUMMARY_LOW_STOCK_LIMIT) {
            message.push_str(&format!("- {}: {} units\n", product.name, product.stock_quantity));
        }
        if low_stock.len() > SUMMARY_LOW_STOCK_LIMIT {
            message.push_str(&format!(
                "- +{} others\n",
                low_stock.len() - SUMMARY_LOW_STOCK_LIMIT
            ));
        }
    }

    message.push_str(&format!("\nGenerated at {}", now.format("%H:%M:%S UTC")));
    message
}
