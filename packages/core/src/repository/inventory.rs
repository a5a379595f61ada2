//! Products and the stock movement ledger.
//!
//! Every stock mutation goes through a single transaction that updates
//! `products.stock_quantity` and appends the matching `stock_movements`
//! row, so the counter and the ledger cannot drift apart.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use crate::error::AppError;
use crate::webhooks::event::LowStockProduct;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    In,
    Out,
    /// Sets the stock to an absolute quantity.
    Adjustment,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::In => "in",
            MovementType::Out => "out",
            MovementType::Adjustment => "adjustment",
        }
    }
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in" => Ok(MovementType::In),
            "out" => Ok(MovementType::Out),
            "adjustment" => Ok(MovementType::Adjustment),
            other => Err(AppError::validation(format!("Unknown movement type '{}'", other))),
        }
    }
}

/// New stock level after applying one movement. Never negative.
pub fn apply_delta(current: i64, movement: MovementType, quantity: i64) -> i64 {
    match movement {
        MovementType::In => current.saturating_add(quantity),
        MovementType::Out => current.saturating_sub(quantity).max(0),
        MovementType::Adjustment => quantity.max(0),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub cost_price: f64,
    pub stock_quantity: i64,
    pub min_stock_level: i64,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub cost_price: f64,
    #[serde(default)]
    pub stock_quantity: i64,
    #[serde(default)]
    pub min_stock_level: i64,
}

/// Full replacement of a product's editable fields.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductUpdate {
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub cost_price: f64,
    pub stock_quantity: i64,
    pub min_stock_level: i64,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: i64,
    pub product_id: i64,
    pub movement_type: MovementType,
    pub quantity: i64,
    pub reason: String,
    pub reference_id: Option<String>,
    pub created_at: String,
}

/// Result of one stock mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockChange {
    pub product_id: i64,
    pub product_name: String,
    pub previous: i64,
    pub current: i64,
    pub min_stock_level: i64,
}

impl StockChange {
    pub fn at_or_below_minimum(&self) -> bool {
        self.current <= self.min_stock_level
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkMode {
    Set,
    Add,
    Subtract,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BulkStockAdjustment {
    #[serde(rename = "type")]
    pub mode: BulkMode,
    pub quantity: i64,
}

fn product_from_row(row: &SqliteRow) -> Result<Product, sqlx::Error> {
    let is_active: i64 = row.try_get("is_active")?;
    Ok(Product {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        price: row.try_get("price")?,
        cost_price: row.try_get("cost_price")?,
        stock_quantity: row.try_get("stock_quantity")?,
        min_stock_level: row.try_get("min_stock_level")?,
        is_active: is_active != 0,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn movement_from_row(row: &SqliteRow) -> Option<StockMovement> {
    let movement_type: String = row.try_get("movement_type").ok()?;
    Some(StockMovement {
        id: row.try_get("id").ok()?,
        product_id: row.try_get("product_id").ok()?,
        movement_type: movement_type.parse().ok()?,
        quantity: row.try_get("quantity").ok()?,
        reason: row.try_get("reason").ok()?,
        reference_id: row.try_get("reference_id").ok()?,
        created_at: row.try_get("created_at").ok()?,
    })
}

const PRODUCT_COLUMNS: &str =
    "id, name, price, cost_price, stock_quantity, min_stock_level, is_active, created_at, updated_at";

/// Repository for products and their stock ledger.
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a product. Non-zero opening stock is logged as an `in` movement.
    pub async fn create_product(&self, product: &NewProduct) -> Result<Product, AppError> {
        if product.name.trim().is_empty() {
            return Err(AppError::validation("Product name is required"));
        }
        if product.stock_quantity < 0 || product.min_stock_level < 0 {
            return Err(AppError::validation("Stock quantities cannot be negative"));
        }

        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO products (name, price, cost_price, stock_quantity, min_stock_level, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(product.name.trim())
        .bind(product.price)
        .bind(product.cost_price)
        .bind(product.stock_quantity)
        .bind(product.min_stock_level)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
        let id = result.last_insert_rowid();

        if product.stock_quantity > 0 {
            insert_movement(&mut tx, id, MovementType::In, product.stock_quantity, "Initial stock", None).await?;
        }
        tx.commit().await?;

        self.get_product(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Product {} not found", id)))
    }

    pub async fn get_product(&self, id: i64) -> Result<Option<Product>, sqlx::Error> {
        let row = sqlx::query(&format!("SELECT {} FROM products WHERE id = ?", PRODUCT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(product_from_row).transpose()
    }

    /// Replace a product's fields. A changed stock quantity is logged as an
    /// `in`/`out` movement for the difference in the same transaction.
    pub async fn update_product(&self, id: i64, update: &ProductUpdate) -> Result<Product, AppError> {
        if update.name.trim().is_empty() {
            return Err(AppError::validation("Product name is required"));
        }
        if update.price < 0.0 || update.cost_price < 0.0 {
            return Err(AppError::validation("Prices cannot be negative"));
        }
        if update.stock_quantity < 0 || update.min_stock_level < 0 {
            return Err(AppError::validation("Stock quantities cannot be negative"));
        }

        let mut tx = self.pool.begin().await?;

        let previous: i64 = sqlx::query("SELECT stock_quantity FROM products WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Product {} not found", id)))?
            .try_get("stock_quantity")?;

        sqlx::query(
            "UPDATE products
             SET name = ?, price = ?, cost_price = ?, stock_quantity = ?, min_stock_level = ?,
                 is_active = COALESCE(?, is_active), updated_at = ?
             WHERE id = ?",
        )
        .bind(update.name.trim())
        .bind(update.price)
        .bind(update.cost_price)
        .bind(update.stock_quantity)
        .bind(update.min_stock_level)
        .bind(update.is_active)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let difference = update.stock_quantity - previous;
        if difference != 0 {
            let movement = if difference > 0 { MovementType::In } else { MovementType::Out };
            insert_movement(
                &mut tx,
                id,
                movement,
                difference.abs(),
                "Manual adjustment",
                Some(&id.to_string()),
            )
            .await?;
        }
        tx.commit().await?;

        self.get_product(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Product {} not found", id)))
    }

    /// Soft delete: the product and its ledger stay, but it drops out of
    /// listings and low-stock reports.
    pub async fn deactivate_product(&self, id: i64) -> Result<Product, AppError> {
        let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Product {} not found", id)));
        }

        self.get_product(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Product {} not found", id)))
    }

    /// Active products ordered by name.
    pub async fn list_products(&self) -> Result<Vec<Product>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM products WHERE is_active = 1 ORDER BY name ASC",
            PRODUCT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(product_from_row).collect()
    }

    /// Active products with `stock_quantity <= min_stock_level`, lowest stock first.
    pub async fn low_stock_products(&self) -> Result<Vec<LowStockProduct>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT name, stock_quantity, min_stock_level FROM products
             WHERE is_active = 1 AND stock_quantity <= min_stock_level
             ORDER BY stock_quantity ASC, name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let products = rows
            .into_iter()
            .filter_map(|row| {
                Some(LowStockProduct {
                    name: row.try_get("name").ok()?,
                    stock_quantity: row.try_get("stock_quantity").ok()?,
                    min_stock_level: row.try_get("min_stock_level").ok()?,
                })
            })
            .collect();

        Ok(products)
    }

    /// Apply one movement: counter update and ledger append commit together.
    pub async fn apply_movement(
        &self,
        product_id: i64,
        movement: MovementType,
        quantity: i64,
        reason: &str,
        reference_id: Option<&str>,
    ) -> Result<StockChange, AppError> {
        if quantity < 0 {
            return Err(AppError::validation("Movement quantity cannot be negative"));
        }

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT name, stock_quantity, min_stock_level FROM products WHERE id = ?")
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Product {} not found", product_id)))?;

        let product_name: String = row.try_get("name")?;
        let previous: i64 = row.try_get("stock_quantity")?;
        let min_stock_level: i64 = row.try_get("min_stock_level")?;
        let current = apply_delta(previous, movement, quantity);

        sqlx::query("UPDATE products SET stock_quantity = ?, updated_at = ? WHERE id = ?")
            .bind(current)
            .bind(Utc::now().to_rfc3339())
            .bind(product_id)
            .execute(&mut *tx)
            .await?;

        insert_movement(&mut tx, product_id, movement, quantity, reason, reference_id).await?;
        tx.commit().await?;

        Ok(StockChange {
            product_id,
            product_name,
            previous,
            current,
            min_stock_level,
        })
    }

    /// Decrement stock for one sold line item, floored at zero.
    pub async fn record_sale_item(
        &self,
        product_id: i64,
        quantity: i64,
        sale_id: i64,
        sale_number: &str,
    ) -> Result<StockChange, AppError> {
        self.apply_movement(
            product_id,
            MovementType::Out,
            quantity,
            &format!("Sale {}", sale_number),
            Some(&sale_id.to_string()),
        )
        .await
    }

    /// Adjust several products at once. The whole batch is rejected if any
    /// product would end up negative.
    pub async fn bulk_adjust(
        &self,
        product_ids: &[i64],
        adjustment: BulkStockAdjustment,
    ) -> Result<Vec<StockChange>, AppError> {
        if product_ids.is_empty() {
            return Err(AppError::validation("At least one product id is required"));
        }
        if adjustment.quantity < 0 {
            return Err(AppError::validation("Adjustment quantity cannot be negative"));
        }

        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;
        let mut changes = Vec::with_capacity(product_ids.len());

        for &product_id in product_ids {
            let row = sqlx::query("SELECT name, stock_quantity, min_stock_level FROM products WHERE id = ?")
                .bind(product_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Product {} not found", product_id)))?;

            let product_name: String = row.try_get("name")?;
            let previous: i64 = row.try_get("stock_quantity")?;
            let min_stock_level: i64 = row.try_get("min_stock_level")?;

            let current = match adjustment.mode {
                BulkMode::Set => adjustment.quantity,
                BulkMode::Add => previous
                    .checked_add(adjustment.quantity)
                    .ok_or_else(|| AppError::validation("Stock quantity overflow"))?,
                BulkMode::Subtract => previous - adjustment.quantity,
            };
            if current < 0 {
                return Err(AppError::validation(format!(
                    "Stock cannot be negative for product: {}",
                    product_name
                )));
            }

            sqlx::query("UPDATE products SET stock_quantity = ?, updated_at = ? WHERE id = ?")
                .bind(current)
                .bind(&now)
                .bind(product_id)
                .execute(&mut *tx)
                .await?;

            let difference = current - previous;
            if difference != 0 {
                let movement = if difference > 0 { MovementType::In } else { MovementType::Out };
                insert_movement(
                    &mut tx,
                    product_id,
                    movement,
                    difference.abs(),
                    "Bulk adjustment",
                    Some(&product_id.to_string()),
                )
                .await?;
            }

            changes.push(StockChange {
                product_id,
                product_name,
                previous,
                current,
                min_stock_level,
            });
        }

        tx.commit().await?;
        Ok(changes)
    }

    /// Ledger entries, newest first. `limit` is clamped to 1..=100.
    pub async fn list_movements(
        &self,
        product_id: Option<i64>,
        limit: i64,
    ) -> Result<Vec<StockMovement>, sqlx::Error> {
        let limit = limit.clamp(1, 100);
        let rows = match product_id {
            Some(id) => {
                sqlx::query(
                    "SELECT id, product_id, movement_type, quantity, reason, reference_id, created_at
                     FROM stock_movements WHERE product_id = ? ORDER BY id DESC LIMIT ?",
                )
                .bind(id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, product_id, movement_type, quantity, reason, reference_id, created_at
                     FROM stock_movements ORDER BY id DESC LIMIT ?",
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.iter().filter_map(movement_from_row).collect())
    }

    /// Replay the ledger for a product from zero.
    pub async fn ledger_balance(&self, product_id: i64) -> Result<i64, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT id, product_id, movement_type, quantity, reason, reference_id, created_at
             FROM stock_movements WHERE product_id = ? ORDER BY id ASC",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .filter_map(movement_from_row)
            .fold(0, |stock, m| apply_delta(stock, m.movement_type, m.quantity)))
    }
}

async fn insert_movement(
    tx: &mut Transaction<'_, Sqlite>,
    product_id: i64,
    movement: MovementType,
    quantity: i64,
    reason: &str,
    reference_id: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO stock_movements (product_id, movement_type, quantity, reason, reference_id, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(product_id)
    .bind(movement.as_str())
    .bind(quantity)
    .bind(reason)
    .bind(reference_id)
    .bind(Utc::now().to_rfc3339())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    use crate::db::create_pool;

    async fn make_repo() -> InventoryRepository {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        InventoryRepository::new(pool)
    }

    fn new_product(name: &str, stock: i64, min: i64) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            price: 10.0,
            cost_price: 4.0,
            stock_quantity: stock,
            min_stock_level: min,
        }
    }

    #[tokio::test]
    async fn create_product_logs_initial_stock() {
        let repo = make_repo().await;
        let product = repo.create_product(&new_product("Tea", 12, 3)).await.unwrap();
        assert_eq!(product.stock_quantity, 12);

        let movements = repo.list_movements(Some(product.id), 10).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].movement_type, MovementType::In);
        assert_eq!(movements[0].quantity, 12);
        assert_eq!(movements[0].reason, "Initial stock");
    }

    #[tokio::test]
    async fn create_product_rejects_blank_name() {
        let repo = make_repo().await;
        let err = repo.create_product(&new_product("  ", 1, 0)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn sale_decrement_is_floored_at_zero() {
        let repo = make_repo().await;
        let product = repo.create_product(&new_product("Tea", 3, 1)).await.unwrap();

        let change = repo.record_sale_item(product.id, 5, 77, "SALE-1").await.unwrap();
        assert_eq!(change.previous, 3);
        assert_eq!(change.current, 0);
        assert!(change.at_or_below_minimum());

        let stored = repo.get_product(product.id).await.unwrap().unwrap();
        assert_eq!(stored.stock_quantity, 0);

        let movements = repo.list_movements(Some(product.id), 10).await.unwrap();
        assert_eq!(movements[0].movement_type, MovementType::Out);
        assert_eq!(movements[0].reason, "Sale SALE-1");
        assert_eq!(movements[0].reference_id.as_deref(), Some("77"));
    }

    #[tokio::test]
    async fn missing_product_is_not_found_and_writes_nothing() {
        let repo = make_repo().await;
        let err = repo
            .apply_movement(999, MovementType::In, 1, "Restock", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(repo.list_movements(None, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn adjustment_sets_absolute_quantity() {
        let repo = make_repo().await;
        let product = repo.create_product(&new_product("Tea", 8, 2)).await.unwrap();
        let change = repo
            .apply_movement(product.id, MovementType::Adjustment, 20, "Stock count", None)
            .await
            .unwrap();
        assert_eq!(change.current, 20);
        assert!(!change.at_or_below_minimum());
    }

    #[tokio::test]
    async fn ledger_replay_matches_counter() {
        let repo = make_repo().await;
        let product = repo.create_product(&new_product("Tea", 5, 2)).await.unwrap();
        repo.apply_movement(product.id, MovementType::In, 10, "Restock", None).await.unwrap();
        repo.record_sale_item(product.id, 4, 1, "SALE-1").await.unwrap();
        repo.apply_movement(product.id, MovementType::Adjustment, 9, "Count", None).await.unwrap();
        repo.record_sale_item(product.id, 50, 2, "SALE-2").await.unwrap();
        repo.apply_movement(product.id, MovementType::In, 3, "Restock", None).await.unwrap();

        let stored = repo.get_product(product.id).await.unwrap().unwrap();
        assert_eq!(stored.stock_quantity, 3);
        assert_eq!(repo.ledger_balance(product.id).await.unwrap(), stored.stock_quantity);
    }

    #[tokio::test]
    async fn bulk_adjust_logs_differences() {
        let repo = make_repo().await;
        let a = repo.create_product(&new_product("A", 5, 0)).await.unwrap();
        let b = repo.create_product(&new_product("B", 10, 0)).await.unwrap();

        let changes = repo
            .bulk_adjust(&[a.id, b.id], BulkStockAdjustment { mode: BulkMode::Set, quantity: 7 })
            .await
            .unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].current, 7);
        assert_eq!(changes[1].current, 7);

        let b_moves = repo.list_movements(Some(b.id), 10).await.unwrap();
        assert_eq!(b_moves[0].movement_type, MovementType::Out);
        assert_eq!(b_moves[0].quantity, 3);
        assert_eq!(b_moves[0].reason, "Bulk adjustment");
        assert_eq!(repo.ledger_balance(b.id).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn bulk_adjust_rejects_negative_and_rolls_back() {
        let repo = make_repo().await;
        let a = repo.create_product(&new_product("A", 10, 0)).await.unwrap();
        let b = repo.create_product(&new_product("B", 2, 0)).await.unwrap();

        let err = repo
            .bulk_adjust(&[a.id, b.id], BulkStockAdjustment { mode: BulkMode::Subtract, quantity: 5 })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("B"));

        let a_after = repo.get_product(a.id).await.unwrap().unwrap();
        assert_eq!(a_after.stock_quantity, 10);
        assert_eq!(repo.list_movements(Some(a.id), 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn bulk_add_overflow_is_rejected_without_writing() {
        let repo = make_repo().await;
        let product = repo.create_product(&new_product("Tea", 5, 0)).await.unwrap();

        let err = repo
            .bulk_adjust(&[product.id], BulkStockAdjustment { mode: BulkMode::Add, quantity: i64::MAX })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(err.to_string().contains("Stock quantity overflow"));

        let stored = repo.get_product(product.id).await.unwrap().unwrap();
        assert_eq!(stored.stock_quantity, 5);
    }

    fn update_of(product: &Product, stock: i64) -> ProductUpdate {
        ProductUpdate {
            name: product.name.clone(),
            price: product.price,
            cost_price: product.cost_price,
            stock_quantity: stock,
            min_stock_level: product.min_stock_level,
            is_active: None,
        }
    }

    #[tokio::test]
    async fn update_product_logs_stock_difference() {
        let repo = make_repo().await;
        let product = repo.create_product(&new_product("Tea", 10, 2)).await.unwrap();

        let mut update = update_of(&product, 4);
        update.name = "Green Tea".into();
        let updated = repo.update_product(product.id, &update).await.unwrap();
        assert_eq!(updated.name, "Green Tea");
        assert_eq!(updated.stock_quantity, 4);
        assert!(updated.is_active);

        let movements = repo.list_movements(Some(product.id), 10).await.unwrap();
        assert_eq!(movements[0].movement_type, MovementType::Out);
        assert_eq!(movements[0].quantity, 6);
        assert_eq!(movements[0].reason, "Manual adjustment");

        repo.update_product(product.id, &update_of(&updated, 9)).await.unwrap();
        assert_eq!(repo.ledger_balance(product.id).await.unwrap(), 9);
    }

    #[tokio::test]
    async fn update_without_stock_change_writes_no_movement() {
        let repo = make_repo().await;
        let product = repo.create_product(&new_product("Tea", 10, 2)).await.unwrap();

        let mut update = update_of(&product, 10);
        update.price = 12.0;
        repo.update_product(product.id, &update).await.unwrap();

        assert_eq!(repo.list_movements(Some(product.id), 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_rejects_negative_stock_and_missing_product() {
        let repo = make_repo().await;
        let product = repo.create_product(&new_product("Tea", 10, 2)).await.unwrap();

        let err = repo.update_product(product.id, &update_of(&product, -1)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = repo.update_product(999, &update_of(&product, 1)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn deactivated_product_leaves_listings() {
        let repo = make_repo().await;
        let product = repo.create_product(&new_product("Tea", 0, 2)).await.unwrap();
        assert_eq!(repo.low_stock_products().await.unwrap().len(), 1);

        let deactivated = repo.deactivate_product(product.id).await.unwrap();
        assert!(!deactivated.is_active);
        assert!(repo.list_products().await.unwrap().is_empty());
        assert!(repo.low_stock_products().await.unwrap().is_empty());

        let err = repo.deactivate_product(999).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn low_stock_lists_products_at_or_below_minimum() {
        let repo = make_repo().await;
        repo.create_product(&new_product("Plenty", 50, 5)).await.unwrap();
        repo.create_product(&new_product("Exactly", 5, 5)).await.unwrap();
        repo.create_product(&new_product("Empty", 0, 2)).await.unwrap();

        let low = repo.low_stock_products().await.unwrap();
        let names: Vec<_> = low.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Empty", "Exactly"]);
    }

    #[tokio::test]
    async fn list_movements_limit_is_clamped() {
        let repo = make_repo().await;
        let product = repo.create_product(&new_product("Tea", 1, 0)).await.unwrap();
        for _ in 0..3 {
            repo.apply_movement(product.id, MovementType::In, 1, "Restock", None).await.unwrap();
        }
        assert_eq!(repo.list_movements(None, 0).await.unwrap().len(), 1);
        assert_eq!(repo.list_movements(None, 999).await.unwrap().len(), 4);
    }

    #[test]
    fn movement_type_parses() {
        assert_eq!("adjustment".parse::<MovementType>().unwrap(), MovementType::Adjustment);
        assert!("sale".parse::<MovementType>().is_err());
    }

    proptest! {
        #[test]
        fn out_movement_never_goes_negative(old in 0i64..1_000_000, sold in 0i64..1_000_000) {
            let new = apply_delta(old, MovementType::Out, sold);
            prop_assert_eq!(new, (old - sold).max(0));
            prop_assert!(new >= 0);
        }
    }
}
