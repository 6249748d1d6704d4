// Fixtures shared by unit tests

use chrono::{DateTime, Duration, TimeZone, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::booking::{Booking, BookingStatus, TicketView};
use crate::models::flight::{Flight, FlightData};
use crate::models::user::{CreateUserData, User};
use crate::models::Money;

pub fn sample_passenger() -> User {
    let now = Utc.with_ymd_and_hms(2019, 4, 10, 9, 0, 0).unwrap();
    User {
        id: Uuid::new_v4(),
        email: "user@example.com".to_string(),
        password_hash: "pbkdf2-sha256$100000$c2FsdA==$aGFzaA==".to_string(),
        first_name: "John".to_string(),
        last_name: "West".to_string(),
        phone_number: Some("2348023894574".to_string()),
        address: None,
        is_admin: false,
        created_at: now,
        updated_at: now,
    }
}

pub fn sample_flight() -> Flight {
    let now = Utc.with_ymd_and_hms(2019, 4, 10, 9, 0, 0).unwrap();
    Flight {
        id: Uuid::new_v4(),
        flight_number: "FE3433".to_string(),
        departure_at: Utc.with_ymd_and_hms(2019, 4, 12, 9, 5, 0).unwrap(),
        arrival_at: Utc.with_ymd_and_hms(2019, 4, 13, 12, 0, 0).unwrap(),
        cost: Money::from_cents(30_000),
        departing: "Lagos".to_string(),
        departing_airport: "LOS".to_string(),
        destination: "Dubai".to_string(),
        destination_airport: "DXB".to_string(),
        created_by: Uuid::new_v4(),
        created_at: now,
        updated_at: now,
    }
}

pub fn sample_booking(flight: &Flight, passenger: &User) -> Booking {
    Booking {
        id: Uuid::new_v4(),
        ticket_number: "EF343F".to_string(),
        flight_id: flight.id,
        passenger_id: passenger.id,
        status: BookingStatus::Booked,
        amount_paid: Money::ZERO,
        created_at: Utc.with_ymd_and_hms(2019, 4, 10, 9, 0, 0).unwrap(),
        reserved_at: None,
    }
}

pub fn sample_ticket() -> TicketView {
    let passenger = sample_passenger();
    let flight = sample_flight();
    let booking = sample_booking(&flight, &passenger);
    TicketView::new(booking, &passenger, flight)
}

pub async fn insert_user(pool: &PgPool, email: &str, is_admin: bool) -> User {
    User::create(
        pool,
        CreateUserData {
            email: email.to_string(),
            password_hash: "pbkdf2-sha256$100000$c2FsdA==$aGFzaA==".to_string(),
            first_name: "John".to_string(),
            last_name: "West".to_string(),
            phone_number: None,
            address: None,
            is_admin,
        },
    )
    .await
    .unwrap()
}

pub async fn insert_flight(pool: &PgPool, created_by: Uuid, departure_at: DateTime<Utc>) -> Flight {
    Flight::create(
        pool,
        created_by,
        FlightData {
            flight_number: "FE3433".to_string(),
            departure_at,
            arrival_at: departure_at + Duration::hours(7),
            cost: Money::from_cents(30_000),
            departing: "Lagos".to_string(),
            departing_airport: "LOS".to_string(),
            destination: "Dubai".to_string(),
            destination_airport: "DXB".to_string(),
        },
    )
    .await
    .unwrap()
}
