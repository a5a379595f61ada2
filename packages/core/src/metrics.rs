//! Prometheus metrics registry for the storefront notifier.
//!
//! [`AppMetrics`] owns all registered metrics and the [`Registry`] they
//! belong to. Construct it once at startup, wrap in `Arc`, and hand it to
//! the notifier, checkout and HTTP layer.
//!
//! Exposed at `GET /metrics` in Prometheus text exposition format
//! (`text/plain; version=0.0.4`).

use prometheus::{Counter, CounterVec, Histogram, HistogramOpts, Opts, Registry};

pub struct AppMetrics {
    /// Webhook dispatch attempts, labelled by event kind and outcome
    /// (`success`, `failure`, or `skipped` when no endpoint resolved).
    pub webhook_dispatches_total: CounterVec,
    /// Round-trip time of webhook dispatches in seconds.
    pub webhook_dispatch_duration: Histogram,
    /// Stock alerts raised by checkout.
    pub stock_alerts_total: Counter,
    /// Sales recorded by checkout.
    pub sales_processed_total: Counter,
    /// Per-item stock updates that failed during checkout.
    pub stock_update_failures_total: Counter,
    /// Events dropped because the notification queue was full or closed.
    pub notifications_dropped_total: Counter,
    pub registry: Registry,
}

impl AppMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let webhook_dispatches_total = CounterVec::new(
            Opts::new(
                "storefront_notify_webhook_dispatches_total",
                "Webhook dispatch attempts by event and outcome",
            ),
            &["event", "outcome"],
        )?;

        let webhook_dispatch_duration = Histogram::with_opts(
            HistogramOpts::new(
                "storefront_notify_webhook_dispatch_duration_seconds",
                "Webhook round-trip time in seconds",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 15.0]),
        )?;

        let stock_alerts_total = Counter::with_opts(Opts::new(
            "storefront_notify_stock_alerts_total",
            "Stock alerts raised at checkout",
        ))?;

        let sales_processed_total = Counter::with_opts(Opts::new(
            "storefront_notify_sales_processed_total",
            "Sales recorded",
        ))?;

        let stock_update_failures_total = Counter::with_opts(Opts::new(
            "storefront_notify_stock_update_failures_total",
            "Line items whose stock update failed",
        ))?;

        let notifications_dropped_total = Counter::with_opts(Opts::new(
            "storefront_notify_notifications_dropped_total",
            "Notifications dropped before dispatch",
        ))?;

        registry.register(Box::new(webhook_dispatches_total.clone()))?;
        registry.register(Box::new(webhook_dispatch_duration.clone()))?;
        registry.register(Box::new(stock_alerts_total.clone()))?;
        registry.register(Box::new(sales_processed_total.clone()))?;
        registry.register(Box::new(stock_update_failures_total.clone()))?;
        registry.register(Box::new(notifications_dropped_total.clone()))?;

        Ok(Self {
            webhook_dispatches_total,
            webhook_dispatch_duration,
            stock_alerts_total,
            sales_processed_total,
            stock_update_failures_total,
            notifications_dropped_total,
            registry,
        })
    }

    pub fn record_dispatch(&self, event: &str, outcome: &str) {
        self.webhook_dispatches_total
            .with_label_values(&[event, outcome])
            .inc();
    }

    /// Render all metrics as Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buf = Vec::new();
        encoder.encode(&metric_families, &mut buf)?;
        Ok(String::from_utf8(buf).unwrap_or_default())
    }
}
