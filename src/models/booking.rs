use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::flight::Flight;
use super::money::Money;
use super::user::{User, UserProfile};

pub const FLIGHT_PASSENGER_CONSTRAINT: &str = "bookings_flight_passenger_key";
pub const TICKET_NUMBER_CONSTRAINT: &str = "bookings_ticket_number_key";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "booking_status")]
pub enum BookingStatus {
    Booked,
    Reserved,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Booked => "Booked",
            BookingStatus::Reserved => "Reserved",
            BookingStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Booked" => Ok(BookingStatus::Booked),
            "Reserved" => Ok(BookingStatus::Reserved),
            "Cancelled" => Ok(BookingStatus::Cancelled),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Booking {
    pub id: Uuid,
    pub ticket_number: String,
    pub flight_id: Uuid,
    pub passenger_id: Uuid,
    pub status: BookingStatus,
    pub amount_paid: Money,
    pub created_at: DateTime<Utc>,
    pub reserved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct CreateBookingData {
    pub flight_id: Uuid,
    pub passenger_id: Uuid,
    pub ticket_number: String,
}

/// Booking with its passenger and flight expanded, as returned to clients
/// and rendered into notification emails
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketView {
    pub id: Uuid,
    pub ticket_number: String,
    pub status: BookingStatus,
    pub amount_paid: Money,
    pub created_at: DateTime<Utc>,
    pub reserved_at: Option<DateTime<Utc>>,
    pub passenger: UserProfile,
    pub flight: Flight,
}

impl TicketView {
    pub fn new(booking: Booking, passenger: &User, flight: Flight) -> Self {
        Self {
            id: booking.id,
            ticket_number: booking.ticket_number,
            status: booking.status,
            amount_paid: booking.amount_paid,
            created_at: booking.created_at,
            reserved_at: booking.reserved_at,
            passenger: UserProfile::from(passenger),
            flight,
        }
    }
}

impl Booking {
    /// Inserts a booking in the Booked state
    pub async fn create(pool: &PgPool, data: CreateBookingData) -> Result<Self, sqlx::Error> {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings (flight_id, passenger_id, ticket_number)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(data.flight_id)
        .bind(data.passenger_id)
        .bind(&data.ticket_number)
        .fetch_one(pool)
        .await?;

        Ok(booking)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            SELECT * FROM bookings WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(booking)
    }

    /// Ticket lookup restricted to the passenger who holds it
    pub async fn find_by_ticket_for_passenger(
        pool: &PgPool,
        ticket_number: &str,
        passenger_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            SELECT * FROM bookings
            WHERE ticket_number = $1 AND passenger_id = $2
            "#,
        )
        .bind(ticket_number)
        .bind(passenger_id)
        .fetch_optional(pool)
        .await?;

        Ok(booking)
    }

    pub async fn exists_for_passenger(
        pool: &PgPool,
        flight_id: Uuid,
        passenger_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM bookings WHERE flight_id = $1 AND passenger_id = $2
            )
            "#,
        )
        .bind(flight_id)
        .bind(passenger_id)
        .fetch_one(pool)
        .await
    }

    pub async fn ticket_number_exists(pool: &PgPool, ticket_number: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(SELECT 1 FROM bookings WHERE ticket_number = $1)
            "#,
        )
        .bind(ticket_number)
        .fetch_one(pool)
        .await
    }

    /// Moves a Booked booking to Reserved.
    ///
    /// Returns `None` when the booking is no longer in the Booked state, which
    /// includes losing a race against a concurrent reservation.
    pub async fn mark_reserved(
        pool: &PgPool,
        id: Uuid,
        amount_paid: Money,
    ) -> Result<Option<Self>, sqlx::Error> {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET
                status = 'Reserved',
                amount_paid = $2,
                reserved_at = NOW()
            WHERE id = $1 AND status = 'Booked'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(amount_paid)
        .fetch_optional(pool)
        .await?;

        Ok(booking)
    }

    /// Bookings of a flight in `status` whose relevant timestamp falls on `date` (UTC).
    /// Booked bookings are matched on creation time, all others on reservation time.
    pub async fn list_by_flight_status_on_date(
        pool: &PgPool,
        flight_id: Uuid,
        status: BookingStatus,
        date: NaiveDate,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = match status {
            BookingStatus::Booked => {
                r#"
                SELECT * FROM bookings
                WHERE flight_id = $1
                  AND status = $2
                  AND (created_at AT TIME ZONE 'UTC')::date = $3
                ORDER BY created_at ASC
                "#
            }
            _ => {
                r#"
                SELECT * FROM bookings
                WHERE flight_id = $1
                  AND status = $2
                  AND (reserved_at AT TIME ZONE 'UTC')::date = $3
                ORDER BY reserved_at ASC
                "#
            }
        };

        let bookings = sqlx::query_as::<_, Booking>(query)
            .bind(flight_id)
            .bind(status)
            .bind(date)
            .fetch_all(pool)
            .await?;

        Ok(bookings)
    }

    /// Cancels unpaid bookings whose flight has already departed
    pub async fn cancel_unpaid_departed(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE bookings b
            SET status = 'Cancelled'
            FROM flights f
            WHERE b.flight_id = f.id
              AND b.status = 'Booked'
              AND f.departure_at <= NOW()
            "#,
        )
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}
