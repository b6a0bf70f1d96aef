//! QuickMemo Background Worker
//!
//! Handles scheduled jobs including:
//! - Subscription lifecycle transitions and expiry warnings (hourly, plus
//!   once at startup)
//! - Billing invariant checks (daily at 5:00 AM UTC)
//! - Read-notification pruning (daily at 3:00 AM UTC)
//!
//! This is the only process with a persistent timer, and it assumes a
//! single running instance: a second replica would double-process the
//! lifecycle batches.

use std::sync::Arc;
use std::time::Duration;

use quickmemo_billing::{BillingService, ViolationSeverity};
use sqlx::postgres::PgPoolOptions;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

/// Days a read notification is kept before pruning.
const NOTIFICATION_RETENTION_DAYS: i32 = 30;

/// Create a database connection pool
async fn create_db_pool() -> anyhow::Result<sqlx::PgPool> {
    #[allow(clippy::expect_used)] // Fail-fast on startup if required config is missing
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&database_url)
        .await?;

    info!("Database pool created");
    Ok(pool)
}

/// Run the lifecycle engine once, logging instead of propagating failure:
/// the run is idempotent and the next tick retries from persisted state.
async fn run_lifecycle(billing: &BillingService) {
    match billing.lifecycle.run_once().await {
        Ok(summary) => {
            if summary.entered_grace > 0 || summary.expired > 0 || summary.warnings_created > 0 {
                info!(
                    entered_grace = summary.entered_grace,
                    expired = summary.expired,
                    warnings_created = summary.warnings_created,
                    "Lifecycle run applied changes"
                );
            }
        }
        Err(e) => {
            error!(error = %e, "Lifecycle run failed; will retry next tick");
        }
    }
}

/// Run the invariant checker and log violations by severity.
async fn run_invariant_checks(billing: &BillingService) {
    match billing.invariants.run_all_checks().await {
        Ok(summary) => {
            if summary.healthy {
                info!(checks_run = summary.checks_run, "All billing invariants hold");
            } else {
                for violation in &summary.violations {
                    match violation.severity {
                        ViolationSeverity::Critical | ViolationSeverity::High => error!(
                            invariant = %violation.invariant,
                            severity = %violation.severity,
                            description = %violation.description,
                            "Billing invariant violated"
                        ),
                        _ => warn!(
                            invariant = %violation.invariant,
                            severity = %violation.severity,
                            description = %violation.description,
                            "Billing invariant violated"
                        ),
                    }
                }
            }
        }
        Err(e) => {
            error!(error = %e, "Invariant check run failed");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    info!("Starting QuickMemo Worker");

    // Create database pool
    let pool = create_db_pool().await?;

    // Create billing service
    let billing = Arc::new(BillingService::new(pool));

    // Run the lifecycle engine once at boot so overdue transitions don't
    // wait for the first scheduled tick.
    info!("Running initial subscription lifecycle pass");
    run_lifecycle(&billing).await;

    // Create scheduler
    let scheduler = JobScheduler::new().await?;

    // Job 1: Subscription lifecycle (hourly)
    // Cron: At minute 0 of every hour
    let lifecycle_billing = billing.clone();
    scheduler
        .add(Job::new_async("0 0 * * * *", move |_uuid, _l| {
            let billing = lifecycle_billing.clone();
            Box::pin(async move {
                info!("Running scheduled subscription lifecycle pass");
                run_lifecycle(&billing).await;
            })
        })?)
        .await?;
    info!("Scheduled: Subscription lifecycle (hourly)");

    // Job 2: Billing invariant checks (daily at 5:00 AM UTC)
    let invariant_billing = billing.clone();
    scheduler
        .add(Job::new_async("0 0 5 * * *", move |_uuid, _l| {
            let billing = invariant_billing.clone();
            Box::pin(async move {
                info!("Running billing invariant checks");
                run_invariant_checks(&billing).await;
            })
        })?)
        .await?;
    info!("Scheduled: Billing invariant checks (daily at 5:00 AM UTC)");

    // Job 3: Prune old read notifications (daily at 3:00 AM UTC)
    let prune_billing = billing.clone();
    scheduler
        .add(Job::new_async("0 0 3 * * *", move |_uuid, _l| {
            let billing = prune_billing.clone();
            Box::pin(async move {
                info!("Running notification pruning");
                match billing
                    .notifications
                    .prune_read_older_than(NOTIFICATION_RETENTION_DAYS)
                    .await
                {
                    Ok(deleted) => info!(deleted = deleted, "Notification pruning complete"),
                    Err(e) => error!(error = %e, "Notification pruning failed"),
                }
            })
        })?)
        .await?;
    info!("Scheduled: Notification pruning (daily at 3:00 AM UTC)");

    // Start the scheduler
    info!("Starting job scheduler");
    scheduler.start().await?;

    info!("QuickMemo Worker started successfully with 3 scheduled jobs");

    // Keep the main task running
    // The scheduler runs jobs in background tasks
    loop {
        tokio::time::sleep(Duration::from_secs(3600)).await;
    }
}
