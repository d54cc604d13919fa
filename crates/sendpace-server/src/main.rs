//! SendPace - dispatch server entry point

use anyhow::Result;
use sendpace_api::{cors_layer, create_router, AppState};
use sendpace_common::config::{Config, LoggingConfig};
use sendpace_core::{
    AnalyticsEngine, BatchService, CampaignLifecycle, DispatchController, DispatchQueue,
    HttpMessagingClient, MessagingClient, MessagingReportService, Pacing, SafetyDelay,
    ScheduledBatchProcessor, StaleBatchDetector,
};
use sendpace_storage::{
    DatabasePool, DbCampaignRepository, DbContactAnalyticsRepository, DbReportConfigRepository,
    DbScheduledMessageRepository, DbTemplateRepository,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load()?;

    init_logging(&config.logging);
    info!("Starting SendPace...");

    // Initialize database
    let db_pool = DatabasePool::new(&config.database).await?;
    info!("Database connection established");

    db_pool.migrate().await?;
    info!("Database migrations completed");

    // Messaging bridge
    let client: Arc<dyn MessagingClient> = Arc::new(HttpMessagingClient::new(&config.messaging)?);
    if !client.is_ready().await {
        info!(
            "Messaging bridge at {} is not ready yet",
            config.messaging.base_url
        );
    }

    // Repositories
    let messages = Arc::new(DbScheduledMessageRepository::new(db_pool.clone()));
    let templates = Arc::new(DbTemplateRepository::new(db_pool.clone()));

    // Campaign tracking and reporting
    let reports = Arc::new(MessagingReportService::new(
        Arc::new(DbReportConfigRepository::new(db_pool.clone())),
        client.clone(),
    ));
    let campaigns = Arc::new(CampaignLifecycle::new(
        Arc::new(DbCampaignRepository::new(db_pool.clone())),
        reports,
    ));
    let analytics = Arc::new(AnalyticsEngine::new(Arc::new(
        DbContactAnalyticsRepository::new(db_pool.clone()),
    )));

    // Interactive dispatch
    let queue = Arc::new(DispatchQueue::new(
        client.clone(),
        campaigns.clone(),
        analytics.clone(),
        Pacing::from_config(&config.dispatch),
    ));
    let dispatch = Arc::new(DispatchController::new(
        queue,
        config.dispatch.log_capacity,
    ));

    // Scheduled batches
    let stale_after = chrono::Duration::seconds(config.scheduler.stale_after_secs as i64);
    let batches = Arc::new(BatchService::new(messages.clone(), templates.clone()));
    let stale = Arc::new(
        StaleBatchDetector::new(messages.clone())
            .with_threshold(stale_after)
            .with_poll_interval(Duration::from_secs(config.scheduler.stale_poll_secs)),
    );

    let shutdown = CancellationToken::new();
    let mut background = Vec::new();

    if config.scheduler.enabled {
        let processor = Arc::new(
            ScheduledBatchProcessor::new(
                messages,
                templates,
                client,
                campaigns.clone(),
                analytics.clone(),
            )
            .with_delay(SafetyDelay::new(
                config.dispatch.min_delay_ms,
                config.dispatch.max_delay_ms,
            ))
            .with_tick_interval(Duration::from_secs(config.scheduler.tick_secs))
            .with_window(stale_after),
        );

        background.push(tokio::spawn(processor.run(shutdown.clone())));
        background.push(tokio::spawn(stale.clone().run(shutdown.clone())));
        info!(
            "Scheduler started (tick: {}s, stale after: {}s)",
            config.scheduler.tick_secs, config.scheduler.stale_after_secs
        );
    } else {
        info!("Scheduler disabled");
    }

    // API server
    let state = Arc::new(AppState {
        db_pool,
        dispatch: dispatch.clone(),
        batches,
        stale,
        campaigns,
        analytics,
    });

    let mut app = create_router(state);
    if let Some(cors) = cors_layer(&config.api.cors_origins) {
        app = app.layer(cors);
    }

    let addr = format!("{}:{}", config.server.bind_address, config.api.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("API server listening on {}", addr);

    let server_shutdown = shutdown.clone();
    let api_handle = tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
            .await;
        if let Err(e) = result {
            error!("API server error: {}", e);
        }
    });

    info!("SendPace started successfully");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    shutdown.cancel();
    dispatch.shutdown().await;

    for handle in background {
        if let Err(e) = handle.await {
            error!("Background task failed: {}", e);
        }
    }
    if let Err(e) = api_handle.await {
        error!("API server task failed: {}", e);
    }

    info!("SendPace shutdown complete");

    Ok(())
}

fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},sendpace_core=debug", config.level)));

    let registry = tracing_subscriber::registry().with(filter);
    if config.format == "json" {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_level(true))
            .init();
    }
}
