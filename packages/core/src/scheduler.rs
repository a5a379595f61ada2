//! Daily summary scheduler.
//!
//! Ticks on a fixed interval and sends the summary for the current UTC day.
//! The first summary goes out one full interval after startup.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::signal;
use tokio::time::{self, Instant};

use crate::summary::DailySummaryJob;

/// Run the summary loop until `Ctrl+C` (SIGINT) is received.
///
/// An interval of `0` disables the loop entirely.
pub async fn run_daily_summary_loop(job: Arc<DailySummaryJob>, interval_seconds: u64) {
    if interval_seconds == 0 {
        tracing::info!("Daily summary scheduler disabled");
        return;
    }

    let period = Duration::from_secs(interval_seconds);
    let mut interval = time::interval_at(Instant::now() + period, period);

    tracing::info!("Daily summary scheduler started (interval: {}s)", interval_seconds);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                summary_tick(&job).await;
            }

            _ = signal::ctrl_c() => {
                tracing::info!("Shutdown signal received. Stopping summary scheduler.");
                break;
            }
        }
    }

    tracing::info!("Daily summary scheduler stopped cleanly");
}

/// Execute a single summary cycle. Errors are logged; the loop keeps going.
async fn summary_tick(job: &DailySummaryJob) {
    let today = Utc::now().date_naive();
    match job.run(today).await {
        Ok(_) => tracing::info!(date = %today, "Daily summary queued"),
        Err(err) => tracing::error!(date = %today, "Daily summary failed: {}", err),
    }
}
