use std::sync::Arc;

use clap::Parser;
use dotenvy::dotenv;
use tower_http::cors::CorsLayer;

use storefront_notify::api::{build_router, AppState};
use storefront_notify::cli::Cli;
use storefront_notify::config::Config;
use storefront_notify::db::create_pool;
use storefront_notify::error::AppError;
use storefront_notify::logging::init_logging;
use storefront_notify::metrics::AppMetrics;
use storefront_notify::scheduler::run_daily_summary_loop;
use storefront_notify::webhooks::{
    EndpointResolver, NotificationQueue, Notifier, WebhookDispatcher, WebhookNotifier,
};

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_logging();

    if let Err(err) = run().await {
        tracing::error!("{}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = Config::from_env().map_err(AppError::Config)?.apply_cli(&cli);

    tracing::info!(
        database = %config.database_url,
        bind = %config.bind_addr,
        summary_interval = config.summary_interval_seconds,
        "Service starting"
    );

    let pool = create_pool(&config.database_url).await?;
    let metrics = Arc::new(
        AppMetrics::new().map_err(|err| AppError::Config(format!("metrics registry: {}", err)))?,
    );

    let resolver = Arc::new(EndpointResolver::new(pool.clone(), config.webhooks.clone()));
    let webhooks = Arc::new(WebhookNotifier::new(
        WebhookDispatcher::new()?,
        resolver,
        pool.clone(),
        metrics.clone(),
    ));

    let (queue, _worker) = NotificationQueue::start(webhooks.clone(), config.queue_capacity, metrics.clone());
    let notifier: Arc<dyn Notifier> = Arc::new(queue);

    let state = AppState::new(pool, notifier, webhooks, metrics);

    tokio::spawn(run_daily_summary_loop(
        state.summary.clone(),
        config.summary_interval_seconds,
    ));

    let app = build_router(state).layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|err| AppError::Config(format!("cannot bind {}: {}", config.bind_addr, err)))?;
    tracing::info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received. Stopping HTTP server.");
        })
        .await
        .map_err(|err| AppError::Network(err.to_string()))?;

    Ok(())
}
