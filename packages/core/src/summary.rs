//! Daily sales summary.

use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::SqlitePool;

use crate::error::AppError;
use crate::repository::inventory::InventoryRepository;
use crate::repository::sales::SalesRepository;
use crate::webhooks::event::{revenue_change_pct, NotificationEvent};
use crate::webhooks::notifier::Notifier;
use crate::webhooks::payload::WebhookPayload;

pub struct DailySummaryJob {
    sales: SalesRepository,
    inventory: InventoryRepository,
    notifier: Arc<dyn Notifier>,
}

impl DailySummaryJob {
    pub fn new(pool: SqlitePool, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            sales: SalesRepository::new(pool.clone()),
            inventory: InventoryRepository::new(pool),
            notifier,
        }
    }

    /// Totals for `date`, compared with the day before, plus current low stock.
    pub async fn build(&self, date: NaiveDate) -> Result<NotificationEvent, AppError> {
        let previous_day = date
            .pred_opt()
            .ok_or_else(|| AppError::validation(format!("No previous day for {}", date)))?;
        let today = self.sales.daily_totals(date).await?;
        let yesterday = self.sales.daily_totals(previous_day).await?;
        let low_stock_products = self.inventory.low_stock_products().await?;

        Ok(NotificationEvent::DailySummary {
            date,
            revenue: today.revenue,
            sales_count: today.sales_count,
            items_sold: today.items_sold,
            revenue_change_pct: revenue_change_pct(today.revenue, yesterday.revenue),
            low_stock_products,
        })
    }

    /// Build the summary for `date`, hand it to the notifier and return the
    /// rendered message.
    pub async fn run(&self, date: NaiveDate) -> Result<String, AppError> {
        let event = self.build(date).await?;
        let message = WebhookPayload::from_event(&event, false, chrono::Utc::now())
            .message
            .unwrap_or_default();

        self.notifier.notify(event).await;
        Ok(message)
    }
}
