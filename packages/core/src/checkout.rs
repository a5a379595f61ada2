//! Sale processing and the stock threshold trigger.
//!
//! A sale is persisted first. Stock is then decremented item by item; a
//! failure on one item is logged and skipped so the rest of the sale still
//! goes through. Each decrement that lands at or below the product's
//! minimum raises one stock alert. Notifications are handed to a
//! [`Notifier`] and can never fail the sale.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::AppError;
use crate::metrics::AppMetrics;
use crate::repository::inventory::{InventoryRepository, StockChange};
use crate::repository::sales::{NewSale, Sale, SalesRepository};
use crate::webhooks::event::NotificationEvent;
use crate::webhooks::notifier::Notifier;

/// `SALE-<yyyymmddHHMMSS>-<4 digits>`.
pub fn generate_sale_number<R: Rng>(now: DateTime<Utc>, rng: &mut R) -> String {
    format!("SALE-{}-{:04}", now.format("%Y%m%d%H%M%S"), rng.gen_range(0..10_000))
}

const SALE_NUMBER_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct FailedItem {
    pub product_id: i64,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutReceipt {
    pub sale: Sale,
    pub stock_changes: Vec<StockChange>,
    pub failed_items: Vec<FailedItem>,
    pub stock_alerts: usize,
}

pub struct Checkout {
    sales: SalesRepository,
    inventory: InventoryRepository,
    notifier: Arc<dyn Notifier>,
    metrics: Arc<AppMetrics>,
}

impl Checkout {
    pub fn new(pool: SqlitePool, notifier: Arc<dyn Notifier>, metrics: Arc<AppMetrics>) -> Self {
        Self {
            sales: SalesRepository::new(pool.clone()),
            inventory: InventoryRepository::new(pool),
            notifier,
            metrics,
        }
    }

    fn validate(sale: &NewSale) -> Result<(), AppError> {
        if sale.items.is_empty() {
            return Err(AppError::validation("Cart items are required"));
        }
        if sale.payment_method.trim().is_empty() {
            return Err(AppError::validation("Payment method is required"));
        }
        if let Some(item) = sale.items.iter().find(|i| i.quantity <= 0 || i.unit_price < 0.0) {
            return Err(AppError::validation(format!(
                "Invalid quantity or price for product {}",
                item.product_id
            )));
        }
        if sale.total_amount() <= 0.0 {
            return Err(AppError::validation("Invalid total amount"));
        }
        Ok(())
    }

    /// Insert the sale, drawing a new number whenever the previous one is
    /// already taken.
    async fn insert_with_unique_number(
        &self,
        sale: &NewSale,
        now: DateTime<Utc>,
        mut next_number: impl FnMut() -> String,
    ) -> Result<Sale, AppError> {
        let mut attempt = 1;
        loop {
            let sale_number = next_number();
            match self.sales.insert_sale(&sale_number, sale, now).await {
                Err(AppError::Database(sqlx::Error::Database(db_err)))
                    if db_err.is_unique_violation() && attempt < SALE_NUMBER_ATTEMPTS =>
                {
                    tracing::warn!(%sale_number, attempt, "Sale number already in use, regenerating");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    pub async fn process(&self, sale: NewSale) -> Result<CheckoutReceipt, AppError> {
        Self::validate(&sale)?;

        let now = Utc::now();
        let stored = self
            .insert_with_unique_number(&sale, now, || generate_sale_number(now, &mut rand::thread_rng()))
            .await?;
        self.metrics.sales_processed_total.inc();

        tracing::info!(
            sale_id = stored.id,
            sale_number = %stored.sale_number,
            total = stored.total_amount,
            items = sale.items.len(),
            "Sale recorded"
        );

        let mut stock_changes = Vec::with_capacity(sale.items.len());
        let mut failed_items = Vec::new();
        let mut stock_alerts = 0;

        for item in &sale.items {
            let change = match self
                .inventory
                .record_sale_item(item.product_id, item.quantity, stored.id, &stored.sale_number)
                .await
            {
                Ok(change) => change,
                Err(err) => {
                    tracing::error!(
                        sale_number = %stored.sale_number,
                        product_id = item.product_id,
                        "Stock update failed: {}",
                        err
                    );
                    self.metrics.stock_update_failures_total.inc();
                    failed_items.push(FailedItem {
                        product_id: item.product_id,
                        error: err.to_string(),
                    });
                    continue;
                }
            };

            if change.at_or_below_minimum() {
                tracing::info!(
                    product_id = change.product_id,
                    stock = change.current,
                    min_stock = change.min_stock_level,
                    "Stock at or below minimum"
                );
                self.notifier
                    .notify(NotificationEvent::stock_alert(
                        change.product_id,
                        change.product_name.clone(),
                        change.current,
                        change.min_stock_level,
                    ))
                    .await;
                self.metrics.stock_alerts_total.inc();
                stock_alerts += 1;
            }
            stock_changes.push(change);
        }

        self.notifier
            .notify(NotificationEvent::SaleCompleted {
                sale_id: stored.id,
                sale_number: stored.sale_number.clone(),
                total_amount: stored.total_amount,
                item_count: sale.items.len(),
            })
            .await;

        Ok(CheckoutReceipt {
            sale: stored,
            stock_changes,
            failed_items,
            stock_alerts,
        })
    }
}
