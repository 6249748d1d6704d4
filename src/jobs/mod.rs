// Background jobs run on a cron schedule

pub mod booking_expiry;

use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tower_sessions::session_store::ExpiredDeletion;
use tower_sessions_sqlx_store::PostgresStore;

/// Hourly purge of expired sessions
const SESSION_CLEANUP_SCHEDULE: &str = "0 0 * * * *";

/// Registers and starts all background jobs
pub async fn start_scheduler(
    pool: PgPool,
    session_store: PostgresStore,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    let expiry_job = Job::new_async(booking_expiry::SCHEDULE, move |_id, _scheduler| {
        let pool = pool.clone();
        Box::pin(async move {
            if let Err(e) = booking_expiry::cancel_expired_bookings(&pool).await {
                tracing::error!(error = %e, "Booking expiry job failed");
            }
        })
    })?;
    scheduler.add(expiry_job).await?;

    let session_job = Job::new_async(SESSION_CLEANUP_SCHEDULE, move |_id, _scheduler| {
        let session_store = session_store.clone();
        Box::pin(async move {
            if let Err(e) = session_store.delete_expired().await {
                tracing::error!(error = %e, "Session cleanup job failed");
            }
        })
    })?;
    scheduler.add(session_job).await?;

    scheduler.start().await?;
    tracing::info!("Job scheduler started");

    Ok(scheduler)
}
