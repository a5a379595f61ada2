//! SQLite pool construction and schema bootstrap.
//!
//! The schema is applied on every startup with `CREATE TABLE IF NOT EXISTS`,
//! so a fresh file (or `sqlite::memory:` in tests) is ready to use as soon as
//! [`create_pool`] returns.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS settings (
        key        TEXT PRIMARY KEY,
        value      TEXT NOT NULL,
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    )",
    "CREATE TABLE IF NOT EXISTS products (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        name            TEXT NOT NULL,
        price           REAL NOT NULL DEFAULT 0,
        cost_price      REAL NOT NULL DEFAULT 0,
        stock_quantity  INTEGER NOT NULL DEFAULT 0 CHECK (stock_quantity >= 0),
        min_stock_level INTEGER NOT NULL DEFAULT 0,
        is_active       INTEGER NOT NULL DEFAULT 1,
        created_at      TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at      TEXT NOT NULL DEFAULT (datetime('now'))
    )",
    "CREATE TABLE IF NOT EXISTS stock_movements (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        product_id    INTEGER NOT NULL REFERENCES products(id),
        movement_type TEXT NOT NULL CHECK (movement_type IN ('in', 'out', 'adjustment')),
        quantity      INTEGER NOT NULL CHECK (quantity >= 0),
        reason        TEXT NOT NULL,
        reference_id  TEXT,
        created_at    TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_stock_movements_product
        ON stock_movements (product_id, created_at)",
    "CREATE TABLE IF NOT EXISTS sales (
        id             INTEGER PRIMARY KEY AUTOINCREMENT,
        sale_number    TEXT NOT NULL UNIQUE,
        total_amount   REAL NOT NULL,
        payment_method TEXT NOT NULL,
        payment_status TEXT NOT NULL DEFAULT 'approved',
        customer_email TEXT,
        notes          TEXT,
        created_at     TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS sale_items (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        sale_id     INTEGER NOT NULL REFERENCES sales(id),
        product_id  INTEGER NOT NULL,
        quantity    INTEGER NOT NULL,
        unit_price  REAL NOT NULL,
        total_price REAL NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS webhook_deliveries (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        event_type  TEXT NOT NULL,
        webhook_url TEXT NOT NULL,
        test        INTEGER NOT NULL DEFAULT 0,
        success     INTEGER NOT NULL,
        error_kind  TEXT,
        http_status INTEGER,
        message     TEXT NOT NULL,
        created_at  TEXT NOT NULL
    )",
];

/// Open a SQLite pool for `database_url` and apply the schema.
///
/// In-memory databases are private to a connection, so they are capped at
/// a single pooled connection.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool_options = if database_url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(5)
    };

    let pool = pool_options.connect_with(options).await?;

    for statement in SCHEMA {
        sqlx::query(statement).execute(&pool).await?;
    }

    Ok(pool)
}
