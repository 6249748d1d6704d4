use sqlx::PgPool;

use crate::models::Booking;

/// Every 15 minutes, on the quarter hour
pub const SCHEDULE: &str = "0 */15 * * * *";

/// Cancels Booked bookings whose flight has already departed.
/// Reserved bookings are left alone.
pub async fn cancel_expired_bookings(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let cancelled = Booking::cancel_unpaid_departed(pool).await?;

    if cancelled > 0 {
        tracing::info!(cancelled, "Cancelled unpaid bookings for departed flights");
    } else {
        tracing::debug!("No unpaid bookings to cancel");
    }

    Ok(cancelled)
}
