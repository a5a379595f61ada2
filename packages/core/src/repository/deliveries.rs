//! Log of webhook delivery attempts, production and diagnostic alike.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::webhooks::diagnostics::DispatchResult;
use crate::webhooks::event::EventKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub id: Option<i64>,
    pub event_type: String,
    pub webhook_url: String,
    pub test: bool,
    pub success: bool,
    pub error_kind: Option<String>,
    pub http_status: Option<i64>,
    pub message: String,
    pub created_at: String,
}

impl DeliveryRecord {
    pub fn from_result(kind: EventKind, url: &str, test: bool, result: &DispatchResult) -> Self {
        Self {
            id: None,
            event_type: kind.as_str().to_string(),
            webhook_url: url.to_string(),
            test,
            success: result.success,
            error_kind: result.error_kind.map(|k| k.as_str().to_string()),
            http_status: result.http_status.map(i64::from),
            message: result.message.clone(),
            created_at: Utc::now().to_rfc3339(),
        }
    }
}

/// Optional filters for [`DeliveryRepository::query`] and [`DeliveryRepository::count`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeliveryFilter {
    pub event_type: Option<String>,
    pub success: Option<bool>,
}

impl DeliveryFilter {
    fn where_clause(&self) -> String {
        let mut conditions = vec!["1=1"];
        if self.event_type.is_some() {
            conditions.push("event_type = ?");
        }
        if self.success.is_some() {
            conditions.push("success = ?");
        }
        conditions.join(" AND ")
    }
}

pub struct DeliveryRepository {
    pool: SqlitePool,
}

impl DeliveryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn record(&self, record: &DeliveryRecord) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO webhook_deliveries
             (event_type, webhook_url, test, success, error_kind, http_status, message, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.event_type)
        .bind(&record.webhook_url)
        .bind(record.test as i64)
        .bind(record.success as i64)
        .bind(&record.error_kind)
        .bind(record.http_status)
        .bind(&record.message)
        .bind(&record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Newest first. `limit` is clamped to 1..=100.
    pub async fn query(&self, filter: &DeliveryFilter, limit: i64) -> Result<Vec<DeliveryRecord>, sqlx::Error> {
        let limit = limit.clamp(1, 100);
        let sql = format!(
            "SELECT id, event_type, webhook_url, test, success, error_kind, http_status, message, created_at
             FROM webhook_deliveries
             WHERE {}
             ORDER BY id DESC
             LIMIT ?",
            filter.where_clause()
        );

        let mut q = sqlx::query(&sql);
        if let Some(event_type) = &filter.event_type {
            q = q.bind(event_type);
        }
        if let Some(success) = filter.success {
            q = q.bind(success as i64);
        }
        let rows = q.bind(limit).fetch_all(&self.pool).await?;

        let records = rows
            .into_iter()
            .filter_map(|row| {
                use sqlx::Row;
                let test: i64 = row.try_get("test").ok()?;
                let success: i64 = row.try_get("success").ok()?;

                Some(DeliveryRecord {
                    id: Some(row.try_get("id").ok()?),
                    event_type: row.try_get("event_type").ok()?,
                    webhook_url: row.try_get("webhook_url").ok()?,
                    test: test != 0,
                    success: success != 0,
                    error_kind: row.try_get("error_kind").ok()?,
                    http_status: row.try_get("http_status").ok()?,
                    message: row.try_get("message").ok()?,
                    created_at: row.try_get("created_at").ok()?,
                })
            })
            .collect();

        Ok(records)
    }

    pub async fn count(&self, filter: &DeliveryFilter) -> Result<i64, sqlx::Error> {
        let sql = format!(
            "SELECT COUNT(*) AS cnt FROM webhook_deliveries WHERE {}",
            filter.where_clause()
        );

        let mut q = sqlx::query(&sql);
        if let Some(event_type) = &filter.event_type {
            q = q.bind(event_type);
        }
        if let Some(success) = filter.success {
            q = q.bind(success as i64);
        }
        let row = q.fetch_one(&self.pool).await?;

        use sqlx::Row;
        row.try_get("cnt")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_pool;
    use crate::webhooks::diagnostics::ErrorKind;

    async fn make_repo() -> DeliveryRepository {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        DeliveryRepository::new(pool)
    }

    fn result(success: bool, status: Option<u16>, kind: Option<ErrorKind>) -> DispatchResult {
        DispatchResult {
            success,
            http_status: status,
            response_body: None,
            error_kind: kind,
            message: "msg".into(),
            suggestion: None,
            details: None,
        }
    }

    #[tokio::test]
    async fn record_and_query_newest_first() {
        let repo = make_repo().await;
        let ok = DeliveryRecord::from_result(EventKind::Sale, "https://a", false, &result(true, Some(200), None));
        let failed = DeliveryRecord::from_result(
            EventKind::StockAlert,
            "https://b",
            true,
            &result(false, Some(404), Some(ErrorKind::HttpError)),
        );
        repo.record(&ok).await.unwrap();
        repo.record(&failed).await.unwrap();

        let all = repo.query(&DeliveryFilter::default(), 50).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].event_type, "stock_alert");
        assert_eq!(all[0].error_kind.as_deref(), Some("HTTPError"));
        assert_eq!(all[0].http_status, Some(404));
        assert!(all[0].test);
        assert!(all[1].success);
    }

    #[tokio::test]
    async fn filters_apply_to_query_and_count() {
        let repo = make_repo().await;
        for (kind, success) in [
            (EventKind::Sale, true),
            (EventKind::Sale, false),
            (EventKind::DailySummary, false),
        ] {
            let record = DeliveryRecord::from_result(kind, "https://x", false, &result(success, None, None));
            repo.record(&record).await.unwrap();
        }

        let sales = DeliveryFilter {
            event_type: Some("sale".into()),
            success: None,
        };
        assert_eq!(repo.count(&sales).await.unwrap(), 2);

        let failed_sales = DeliveryFilter {
            event_type: Some("sale".into()),
            success: Some(false),
        };
        let rows = repo.query(&failed_sales, 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].success);

        assert_eq!(repo.count(&DeliveryFilter::default()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn limit_is_clamped() {
        let repo = make_repo().await;
        for _ in 0..3 {
            let record = DeliveryRecord::from_result(EventKind::Sale, "https://x", false, &result(true, None, None));
            repo.record(&record).await.unwrap();
        }
        assert_eq!(repo.query(&DeliveryFilter::default(), -5).await.unwrap().len(), 1);
    }
}
