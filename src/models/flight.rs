use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::money::Money;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Flight {
    pub id: Uuid,
    pub flight_number: String,
    pub departure_at: DateTime<Utc>,
    pub arrival_at: DateTime<Utc>,
    pub cost: Money,
    pub departing: String,
    pub departing_airport: String,
    pub destination: String,
    pub destination_airport: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A complete, validated set of flight fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlightData {
    pub flight_number: String,
    pub departure_at: DateTime<Utc>,
    pub arrival_at: DateTime<Utc>,
    pub cost: Money,
    pub departing: String,
    pub departing_airport: String,
    pub destination: String,
    pub destination_airport: String,
}

impl From<&Flight> for FlightData {
    fn from(flight: &Flight) -> Self {
        Self {
            flight_number: flight.flight_number.clone(),
            departure_at: flight.departure_at,
            arrival_at: flight.arrival_at,
            cost: flight.cost,
            departing: flight.departing.clone(),
            departing_airport: flight.departing_airport.clone(),
            destination: flight.destination.clone(),
            destination_airport: flight.destination_airport.clone(),
        }
    }
}

impl Flight {
    /// Create a new flight
    pub async fn create(
        pool: &PgPool,
        created_by: Uuid,
        data: FlightData,
    ) -> Result<Self, sqlx::Error> {
        let flight = sqlx::query_as::<_, Flight>(
            r#"
            INSERT INTO flights (
                flight_number, departure_at, arrival_at, cost,
                departing, departing_airport, destination, destination_airport, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(data.flight_number)
        .bind(data.departure_at)
        .bind(data.arrival_at)
        .bind(data.cost)
        .bind(data.departing)
        .bind(data.departing_airport)
        .bind(data.destination)
        .bind(data.destination_airport)
        .bind(created_by)
        .fetch_one(pool)
        .await?;

        Ok(flight)
    }

    /// Find flight by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let flight = sqlx::query_as::<_, Flight>(
            r#"
            SELECT * FROM flights WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(flight)
    }

    /// List all flights, soonest departure first
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let flights = sqlx::query_as::<_, Flight>(
            r#"
            SELECT * FROM flights
            ORDER BY departure_at ASC
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(flights)
    }

    /// Overwrite every mutable field of a flight
    pub async fn update(pool: &PgPool, id: Uuid, data: FlightData) -> Result<Option<Self>, sqlx::Error> {
        let flight = sqlx::query_as::<_, Flight>(
            r#"
            UPDATE flights
            SET
                flight_number = $2,
                departure_at = $3,
                arrival_at = $4,
                cost = $5,
                departing = $6,
                departing_airport = $7,
                destination = $8,
                destination_airport = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.flight_number)
        .bind(data.departure_at)
        .bind(data.arrival_at)
        .bind(data.cost)
        .bind(data.departing)
        .bind(data.departing_airport)
        .bind(data.destination)
        .bind(data.destination_airport)
        .fetch_optional(pool)
        .await?;

        Ok(flight)
    }

    /// Delete a flight and, through the foreign key, its bookings.
    /// Returns false when no such flight existed.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM flights WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
