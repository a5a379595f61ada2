//! Sales and their line items.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::error::AppError;

/// Only approved sales count toward revenue.
pub const APPROVED: &str = "approved";

#[derive(Debug, Clone, Deserialize)]
pub struct SaleItemInput {
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: f64,
}

fn default_payment_method() -> String {
    "credit_card".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSale {
    pub items: Vec<SaleItemInput>,
    #[serde(default = "default_payment_method")]
    pub payment_method: String,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewSale {
    pub fn total_amount(&self) -> f64 {
        self.items
            .iter()
            .map(|item| item.unit_price * item.quantity as f64)
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub id: i64,
    pub sale_number: String,
    pub total_amount: f64,
    pub payment_method: String,
    pub payment_status: String,
    pub customer_email: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleItem {
    pub id: i64,
    pub sale_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: f64,
    pub total_price: f64,
}

/// Aggregates over one UTC calendar day of approved sales.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DailyTotals {
    pub revenue: f64,
    pub sales_count: i64,
    pub items_sold: i64,
}

const SALE_COLUMNS: &str =
    "id, sale_number, total_amount, payment_method, payment_status, customer_email, notes, created_at";

fn sale_from_row(row: &SqliteRow) -> Result<Sale, sqlx::Error> {
    Ok(Sale {
        id: row.try_get("id")?,
        sale_number: row.try_get("sale_number")?,
        total_amount: row.try_get("total_amount")?,
        payment_method: row.try_get("payment_method")?,
        payment_status: row.try_get("payment_status")?,
        customer_email: row.try_get("customer_email")?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
    })
}

pub struct SalesRepository {
    pool: SqlitePool,
}

impl SalesRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert the sale header and all its line items in one transaction.
    pub async fn insert_sale(
        &self,
        sale_number: &str,
        sale: &NewSale,
        created_at: DateTime<Utc>,
    ) -> Result<Sale, AppError> {
        let total = sale.total_amount();
        let created_at = created_at.to_rfc3339_opts(SecondsFormat::Secs, true);

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO sales (sale_number, total_amount, payment_method, payment_status, customer_email, notes, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(sale_number)
        .bind(total)
        .bind(&sale.payment_method)
        .bind(APPROVED)
        .bind(&sale.customer_email)
        .bind(&sale.notes)
        .bind(&created_at)
        .execute(&mut *tx)
        .await?;
        let sale_id = result.last_insert_rowid();

        for item in &sale.items {
            sqlx::query(
                "INSERT INTO sale_items (sale_id, product_id, quantity, unit_price, total_price)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(sale_id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(item.unit_price * item.quantity as f64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(Sale {
            id: sale_id,
            sale_number: sale_number.to_string(),
            total_amount: total,
            payment_method: sale.payment_method.clone(),
            payment_status: APPROVED.to_string(),
            customer_email: sale.customer_email.clone(),
            notes: sale.notes.clone(),
            created_at,
        })
    }

    pub async fn get_sale(&self, id: i64) -> Result<Option<Sale>, sqlx::Error> {
        let row = sqlx::query(&format!("SELECT {} FROM sales WHERE id = ?", SALE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(sale_from_row).transpose()
    }

    /// Sales newest first, optionally filtered by payment status.
    /// `limit` is clamped to 1..=100.
    pub async fn list_sales(&self, status: Option<&str>, limit: i64) -> Result<Vec<Sale>, sqlx::Error> {
        let limit = limit.clamp(1, 100);
        let mut sql = format!("SELECT {} FROM sales WHERE 1=1", SALE_COLUMNS);
        if status.is_some() {
            sql.push_str(" AND payment_status = ?");
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC LIMIT ?");

        let mut q = sqlx::query(&sql);
        if let Some(status) = status {
            q = q.bind(status);
        }
        let rows = q.bind(limit).fetch_all(&self.pool).await?;

        rows.iter().map(sale_from_row).collect()
    }

    pub async fn list_items(&self, sale_id: i64) -> Result<Vec<SaleItem>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT id, sale_id, product_id, quantity, unit_price, total_price
             FROM sale_items WHERE sale_id = ? ORDER BY id ASC",
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .filter_map(|row| {
                Some(SaleItem {
                    id: row.try_get("id").ok()?,
                    sale_id: row.try_get("sale_id").ok()?,
                    product_id: row.try_get("product_id").ok()?,
                    quantity: row.try_get("quantity").ok()?,
                    unit_price: row.try_get("unit_price").ok()?,
                    total_price: row.try_get("total_price").ok()?,
                })
            })
            .collect();

        Ok(items)
    }

    /// Revenue, sale count and units sold for approved sales on `date` (UTC).
    pub async fn daily_totals(&self, date: NaiveDate) -> Result<DailyTotals, sqlx::Error> {
        let day = date.format("%Y-%m-%d").to_string();

        let row = sqlx::query(
            "SELECT COALESCE(SUM(total_amount), 0.0) AS revenue, COUNT(*) AS sales_count
             FROM sales
             WHERE substr(created_at, 1, 10) = ? AND payment_status = ?",
        )
        .bind(&day)
        .bind(APPROVED)
        .fetch_one(&self.pool)
        .await?;
        let revenue: f64 = row.try_get("revenue")?;
        let sales_count: i64 = row.try_get("sales_count")?;

        let row = sqlx::query(
            "SELECT COALESCE(SUM(si.quantity), 0) AS items_sold
             FROM sale_items si
             JOIN sales s ON s.id = si.sale_id
             WHERE substr(s.created_at, 1, 10) = ? AND s.payment_status = ?",
        )
        .bind(&day)
        .bind(APPROVED)
        .fetch_one(&self.pool)
        .await?;
        let items_sold: i64 = row.try_get("items_sold")?;

        Ok(DailyTotals {
            revenue,
            sales_count,
            items_sold,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    use crate::db::create_pool;

    async fn make_repo() -> SalesRepository {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        SalesRepository::new(pool)
    }

    fn sale(items: &[(i64, i64, f64)]) -> NewSale {
        NewSale {
            items: items
                .iter()
                .map(|&(product_id, quantity, unit_price)| SaleItemInput {
                    product_id,
                    quantity,
                    unit_price,
                })
                .collect(),
            payment_method: "pix".into(),
            customer_email: None,
            notes: None,
        }
    }

    #[test]
    fn total_is_sum_of_line_totals() {
        assert_eq!(sale(&[(1, 2, 10.0), (2, 1, 5.5)]).total_amount(), 25.5);
        assert_eq!(sale(&[]).total_amount(), 0.0);
    }

    #[tokio::test]
    async fn insert_sale_persists_header_and_items() {
        let repo = make_repo().await;
        let stored = repo
            .insert_sale("SALE-1", &sale(&[(1, 2, 10.0), (2, 1, 5.0)]), Utc::now())
            .await
            .unwrap();
        assert_eq!(stored.total_amount, 25.0);
        assert_eq!(stored.payment_status, APPROVED);

        let fetched = repo.get_sale(stored.id).await.unwrap().unwrap();
        assert_eq!(fetched, stored);

        let items = repo.list_items(stored.id).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].total_price, 20.0);
    }

    #[tokio::test]
    async fn duplicate_sale_number_is_rejected() {
        let repo = make_repo().await;
        repo.insert_sale("SALE-1", &sale(&[(1, 1, 1.0)]), Utc::now()).await.unwrap();
        let err = repo.insert_sale("SALE-1", &sale(&[(1, 1, 1.0)]), Utc::now()).await;
        assert!(matches!(err, Err(AppError::Database(_))));
    }

    #[tokio::test]
    async fn daily_totals_only_count_that_day() {
        let repo = make_repo().await;
        let today = Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap();
        let yesterday = today - Duration::days(1);

        repo.insert_sale("SALE-A", &sale(&[(1, 2, 10.0)]), today).await.unwrap();
        repo.insert_sale("SALE-B", &sale(&[(1, 1, 5.0), (2, 3, 1.0)]), today).await.unwrap();
        repo.insert_sale("SALE-C", &sale(&[(1, 1, 100.0)]), yesterday).await.unwrap();

        let totals = repo.daily_totals(today.date_naive()).await.unwrap();
        assert_eq!(totals.revenue, 28.0);
        assert_eq!(totals.sales_count, 2);
        assert_eq!(totals.items_sold, 6);

        let previous = repo.daily_totals(yesterday.date_naive()).await.unwrap();
        assert_eq!(previous.revenue, 100.0);
    }

    #[tokio::test]
    async fn list_sales_newest_first_with_status_filter() {
        let repo = make_repo().await;
        let earlier = Utc.with_ymd_and_hms(2026, 10, 15, 9, 0, 0).unwrap();
        let later = earlier + Duration::hours(3);

        repo.insert_sale("SALE-OLD", &sale(&[(1, 1, 5.0)]), earlier).await.unwrap();
        repo.insert_sale("SALE-NEW", &sale(&[(1, 1, 7.0)]), later).await.unwrap();

        let all = repo.list_sales(None, 20).await.unwrap();
        let numbers: Vec<_> = all.iter().map(|s| s.sale_number.as_str()).collect();
        assert_eq!(numbers, vec!["SALE-NEW", "SALE-OLD"]);

        assert_eq!(repo.list_sales(Some(APPROVED), 1).await.unwrap().len(), 1);
        assert!(repo.list_sales(Some("pending"), 20).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn daily_totals_empty_day_is_zero() {
        let repo = make_repo().await;
        let totals = repo
            .daily_totals(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap())
            .await
            .unwrap();
        assert_eq!(totals, DailyTotals::default());
    }
}
