//! Best-effort event delivery.
//!
//! Business flows only see the [`Notifier`] trait. In production that is a
//! [`NotificationQueue`], which enqueues and returns immediately; a worker
//! task drains the queue into a [`WebhookNotifier`], which resolves the
//! endpoint, dispatches exactly once and records the attempt.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

use super::diagnostics::DispatchResult;
use super::dispatcher::WebhookDispatcher;
use super::event::{EventKind, NotificationEvent};
use super::payload::WebhookPayload;
use super::resolver::EndpointResolver;
use crate::error::AppError;
use crate::metrics::AppMetrics;
use crate::repository::deliveries::{DeliveryRecord, DeliveryRepository};

/// Fire-and-forget sink for notification events.
///
/// Implementations must never surface delivery failures to the caller.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: NotificationEvent);
}

/// One delivery attempt and where it went.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub url: String,
    pub result: DispatchResult,
}

pub struct WebhookNotifier {
    dispatcher: WebhookDispatcher,
    resolver: Arc<EndpointResolver>,
    deliveries: DeliveryRepository,
    metrics: Arc<AppMetrics>,
}

impl WebhookNotifier {
    pub fn new(
        dispatcher: WebhookDispatcher,
        resolver: Arc<EndpointResolver>,
        pool: SqlitePool,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self {
            dispatcher,
            resolver,
            deliveries: DeliveryRepository::new(pool),
            metrics,
        }
    }

    /// Resolve the endpoint for `event`, POST it once and record the attempt.
    ///
    /// Returns `Ok(None)` when no active endpoint is configured for the kind.
    pub async fn deliver(&self, event: &NotificationEvent) -> Result<Option<Delivery>, AppError> {
        let kind = event.kind();
        let Some(endpoint) = self.resolver.resolve(kind).await? else {
            tracing::debug!(event = %kind, "No webhook configured, skipping");
            self.metrics.record_dispatch(kind.as_str(), "skipped");
            return Ok(None);
        };

        let payload = WebhookPayload::from_event(event, false, Utc::now());
        let delivery = self
            .send(kind, &endpoint.url, endpoint.token.as_deref(), &payload)
            .await;
        Ok(Some(delivery))
    }

    /// Send the diagnostic payload for `kind`.
    ///
    /// Explicit `url`/`token` override the configured ones. Returns
    /// `Ok(None)` if no URL was given and none is configured.
    pub async fn send_test(
        &self,
        kind: EventKind,
        url: Option<&str>,
        token: Option<&str>,
    ) -> Result<Option<Delivery>, AppError> {
        let url = match url.map(str::trim).filter(|u| !u.is_empty()) {
            Some(url) => self.resolver.expand_url(url).await?,
            None => match self.resolver.resolve(kind).await? {
                Some(endpoint) => endpoint.url,
                None => return Ok(None),
            },
        };
        let token = match token.map(str::trim).filter(|t| !t.is_empty()) {
            Some(token) => Some(token.to_string()),
            None => self.resolver.token().await?,
        };

        let payload = WebhookPayload::test_for(kind, Utc::now());
        Ok(Some(self.send(kind, &url, token.as_deref(), &payload).await))
    }

    async fn send(&self, kind: EventKind, url: &str, token: Option<&str>, payload: &WebhookPayload) -> Delivery {
        let started = Instant::now();
        let result = self.dispatcher.dispatch(url, token, payload).await;
        self.metrics
            .webhook_dispatch_duration
            .observe(started.elapsed().as_secs_f64());

        if result.success {
            tracing::info!(
                event = %kind,
                url,
                status = result.http_status,
                test = payload.test,
                "Webhook delivered"
            );
            self.metrics.record_dispatch(kind.as_str(), "success");
        } else {
            tracing::warn!(
                event = %kind,
                url,
                error_kind = result.error_kind.map(|k| k.as_str()),
                status = result.http_status,
                test = payload.test,
                "Webhook delivery failed: {}",
                result.message
            );
            self.metrics.record_dispatch(kind.as_str(), "failure");
        }

        let record = DeliveryRecord::from_result(kind, url, payload.test, &result);
        if let Err(err) = self.deliveries.record(&record).await {
            tracing::error!("Failed to record webhook delivery to {}: {}", url, err);
        }

        Delivery {
            url: url.to_string(),
            result,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, event: NotificationEvent) {
        if let Err(err) = self.deliver(&event).await {
            tracing::error!(event = %event.kind(), "Webhook delivery aborted: {}", err);
        }
    }
}

/// Bounded queue in front of another [`Notifier`].
///
/// `notify` never waits: when the queue is full the event is dropped with
/// a warning.
pub struct NotificationQueue {
    sender: mpsc::Sender<NotificationEvent>,
    metrics: Arc<AppMetrics>,
}

impl NotificationQueue {
    /// Spawn the worker and return the queue handle.
    ///
    /// The worker exits once every queue handle has been dropped.
    pub fn start(
        inner: Arc<dyn Notifier>,
        capacity: usize,
        metrics: Arc<AppMetrics>,
    ) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::channel::<NotificationEvent>(capacity.max(1));

        let worker = tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                inner.notify(event).await;
            }
            tracing::info!("Notification worker stopped");
        });

        (Self { sender, metrics }, worker)
    }
}

#[async_trait]
impl Notifier for NotificationQueue {
    async fn notify(&self, event: NotificationEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                tracing::warn!(event = %event.kind(), "Notification queue full, dropping event");
                self.metrics.notifications_dropped_total.inc();
            }
            Err(TrySendError::Closed(event)) => {
                tracing::warn!(event = %event.kind(), "Notification worker gone, dropping event");
                self.metrics.notifications_dropped_total.inc();
            }
        }
    }
}
