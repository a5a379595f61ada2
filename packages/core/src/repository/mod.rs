//! SQLite repositories.
//!
//! Each repository owns a clone of the shared [`sqlx::SqlitePool`]; the
//! schema itself lives in [`crate::db`].

pub mod deliveries;
pub mod inventory;
pub mod sales;
pub mod settings;

pub use deliveries::{DeliveryFilter, DeliveryRecord, DeliveryRepository};
pub use inventory::{InventoryRepository, MovementType, StockChange};
pub use sales::{NewSale, SalesRepository};
pub use settings::{SettingsRepository, WebhookSettings};
