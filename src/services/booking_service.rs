use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::error::{AppError, FieldErrors, NON_FIELD_ERRORS};
use crate::models::booking::{
    Booking, BookingStatus, CreateBookingData, TicketView, FLIGHT_PASSENGER_CONSTRAINT,
    TICKET_NUMBER_CONSTRAINT,
};
use crate::models::flight::Flight;
use crate::models::user::User;
use crate::models::Money;
use crate::services::notifier::{Notification, Notifier};
use crate::services::ticket::{self, TicketError};

/// Insert attempts when a freshly drawn ticket number loses a race on the
/// unique constraint
const MAX_INSERT_ATTEMPTS: usize = 3;

#[derive(thiserror::Error, Debug)]
pub enum BookingError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Ticket(#[from] TicketError),

    #[error("Flight with the id \"{0}\" does not exist")]
    FlightNotFound(Uuid),

    #[error("Ticket already booked")]
    AlreadyBooked,

    #[error("Booking not found")]
    BookingNotFound,

    #[error("Ticket not found")]
    TicketNotFound,

    #[error("Passenger account no longer exists")]
    PassengerNotFound,

    #[error("You have not booked this flight")]
    NotOwner,

    #[error("Flight already reserved")]
    AlreadyReserved,

    #[error("Booking has been cancelled")]
    Cancelled,

    #[error("Field amount paid is required")]
    AmountRequired,

    #[error("Amount paid is not equal to the flight cost")]
    AmountMismatch,

    /// Unreadable request body, reported only once the booking itself is reservable
    #[error(transparent)]
    Request(AppError),
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::Database(e) => AppError::Database(e),
            BookingError::Ticket(TicketError::Database(e)) => AppError::Database(e),
            BookingError::Ticket(e @ TicketError::Exhausted(_)) => AppError::Internal(e.into()),
            BookingError::FlightNotFound(_) => AppError::validation(
                "Could not book the flight",
                FieldErrors::single("flight_id", err.to_string()),
            ),
            BookingError::AlreadyBooked => AppError::validation(
                "Could not book the flight",
                FieldErrors::single(NON_FIELD_ERRORS, err.to_string()),
            ),
            BookingError::BookingNotFound | BookingError::TicketNotFound => {
                AppError::NotFound(err.to_string())
            }
            BookingError::PassengerNotFound => {
                AppError::Unauthorized("Authentication credentials were not provided.".to_string())
            }
            BookingError::NotOwner => AppError::Forbidden(err.to_string()),
            BookingError::AlreadyReserved | BookingError::Cancelled => {
                AppError::Conflict(err.to_string())
            }
            BookingError::AmountRequired | BookingError::AmountMismatch => AppError::validation(
                "Flight not reserved",
                FieldErrors::single(NON_FIELD_ERRORS, err.to_string()),
            ),
            BookingError::Request(e) => e,
        }
    }
}

/// Checks whether `passenger_id` may reserve `booking` by paying `amount_paid`
/// for a flight costing `cost`. Returns the accepted amount.
///
/// `amount_paid` is the parsed request body. A body that could not be read is
/// only reported after ownership and status have been checked.
pub fn check_reservable(
    booking: &Booking,
    passenger_id: Uuid,
    amount_paid: Result<Option<Money>, AppError>,
    cost: Money,
) -> Result<Money, BookingError> {
    if booking.passenger_id != passenger_id {
        return Err(BookingError::NotOwner);
    }

    match booking.status {
        BookingStatus::Reserved => return Err(BookingError::AlreadyReserved),
        BookingStatus::Cancelled => return Err(BookingError::Cancelled),
        BookingStatus::Booked => {}
    }

    let amount = amount_paid
        .map_err(BookingError::Request)?
        .ok_or(BookingError::AmountRequired)?;
    if amount != cost {
        return Err(BookingError::AmountMismatch);
    }

    Ok(amount)
}

/// Books a flight for a passenger and queues the e-ticket email
#[tracing::instrument(skip(pool, notifier))]
pub async fn create_booking(
    pool: &PgPool,
    notifier: &Notifier,
    passenger_id: Uuid,
    flight_id: Uuid,
) -> Result<TicketView, BookingError> {
    let flight = Flight::find_by_id(pool, flight_id)
        .await?
        .ok_or(BookingError::FlightNotFound(flight_id))?;

    if Booking::exists_for_passenger(pool, flight_id, passenger_id).await? {
        return Err(BookingError::AlreadyBooked);
    }

    let passenger = User::find_by_id(pool, passenger_id)
        .await?
        .ok_or(BookingError::PassengerNotFound)?;

    let booking = insert_with_fresh_ticket(pool, flight_id, passenger_id).await?;

    tracing::info!(
        booking_id = %booking.id,
        ticket_number = %booking.ticket_number,
        "Flight booked"
    );

    let ticket = TicketView::new(booking, &passenger, flight);
    notifier.dispatch(Notification::TicketIssued(ticket.clone()));

    Ok(ticket)
}

async fn insert_with_fresh_ticket(
    pool: &PgPool,
    flight_id: Uuid,
    passenger_id: Uuid,
) -> Result<Booking, BookingError> {
    for attempt in 1..=MAX_INSERT_ATTEMPTS {
        let ticket_number = ticket::issue_ticket_number(move |candidate| async move {
            Booking::ticket_number_exists(pool, &candidate).await
        })
        .await?;

        let data = CreateBookingData {
            flight_id,
            passenger_id,
            ticket_number,
        };

        match Booking::create(pool, data).await {
            Ok(booking) => return Ok(booking),
            Err(e) => match db::violated_constraint(&e) {
                Some(FLIGHT_PASSENGER_CONSTRAINT) => return Err(BookingError::AlreadyBooked),
                Some(TICKET_NUMBER_CONSTRAINT) => {
                    tracing::debug!(attempt, "Ticket number taken at insert, retrying");
                }
                _ => return Err(e.into()),
            },
        }
    }

    Err(TicketError::Exhausted(MAX_INSERT_ATTEMPTS).into())
}

/// Pays for a booking and queues the confirmation email
#[tracing::instrument(skip(pool, notifier))]
pub async fn reserve_booking(
    pool: &PgPool,
    notifier: &Notifier,
    passenger_id: Uuid,
    booking_id: Uuid,
    amount_paid: Result<Option<Money>, AppError>,
) -> Result<TicketView, BookingError> {
    let booking = Booking::find_by_id(pool, booking_id)
        .await?
        .ok_or(BookingError::BookingNotFound)?;

    // Bookings cascade with their flight
    let flight = Flight::find_by_id(pool, booking.flight_id)
        .await?
        .ok_or(BookingError::BookingNotFound)?;

    let amount = check_reservable(&booking, passenger_id, amount_paid, flight.cost)?;

    let Some(reserved) = Booking::mark_reserved(pool, booking.id, amount).await? else {
        // Status changed between the read and the update
        let current = Booking::find_by_id(pool, booking.id).await?;
        return Err(match current.map(|b| b.status) {
            Some(BookingStatus::Cancelled) => BookingError::Cancelled,
            Some(_) => BookingError::AlreadyReserved,
            None => BookingError::BookingNotFound,
        });
    };

    let passenger = User::find_by_id(pool, passenger_id)
        .await?
        .ok_or(BookingError::PassengerNotFound)?;

    tracing::info!(
        booking_id = %reserved.id,
        amount_paid = %reserved.amount_paid,
        "Flight reserved"
    );

    let ticket = TicketView::new(reserved, &passenger, flight);
    notifier.dispatch(Notification::ReservationConfirmed(ticket.clone()));

    Ok(ticket)
}

/// Looks up one of the passenger's own tickets
pub async fn find_ticket(
    pool: &PgPool,
    passenger_id: Uuid,
    ticket_number: &str,
) -> Result<TicketView, BookingError> {
    let booking = Booking::find_by_ticket_for_passenger(pool, ticket_number, passenger_id)
        .await?
        .ok_or(BookingError::TicketNotFound)?;

    let flight = Flight::find_by_id(pool, booking.flight_id)
        .await?
        .ok_or(BookingError::TicketNotFound)?;

    let passenger = User::find_by_id(pool, passenger_id)
        .await?
        .ok_or(BookingError::PassengerNotFound)?;

    Ok(TicketView::new(booking, &passenger, flight))
}

/// Bookings of a flight in `status` on `date`, or `None` when the flight does not exist
pub async fn bookings_on_date(
    pool: &PgPool,
    flight_id: Uuid,
    date: NaiveDate,
    status: BookingStatus,
) -> Result<Option<Vec<Booking>>, sqlx::Error> {
    if Flight::find_by_id(pool, flight_id).await?.is_none() {
        return Ok(None);
    }

    let bookings = Booking::list_by_flight_status_on_date(pool, flight_id, status, date).await?;
    Ok(Some(bookings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{
        insert_flight, insert_user, sample_booking, sample_flight, sample_passenger,
    };
    use axum::http::StatusCode;
    use chrono::{Duration, Utc};

    fn fixture() -> (Booking, Uuid, Money) {
        let passenger = sample_passenger();
        let flight = sample_flight();
        (sample_booking(&flight, &passenger), passenger.id, flight.cost)
    }

    #[test]
    fn test_reservable_with_exact_amount() {
        let (booking, passenger_id, cost) = fixture();
        let amount = check_reservable(&booking, passenger_id, Ok(Some(cost)), cost).unwrap();
        assert_eq!(amount, cost);
    }

    #[test]
    fn test_other_passenger_is_rejected_first() {
        let (mut booking, _, cost) = fixture();
        booking.status = BookingStatus::Reserved;

        let result = check_reservable(&booking, Uuid::new_v4(), Ok(None), cost);
        assert!(matches!(result, Err(BookingError::NotOwner)));
    }

    #[test]
    fn test_status_checked_before_amount() {
        let (mut booking, passenger_id, cost) = fixture();

        booking.status = BookingStatus::Reserved;
        let result = check_reservable(&booking, passenger_id, Ok(None), cost);
        assert!(matches!(result, Err(BookingError::AlreadyReserved)));

        booking.status = BookingStatus::Cancelled;
        let result = check_reservable(&booking, passenger_id, Ok(Some(cost)), cost);
        assert!(matches!(result, Err(BookingError::Cancelled)));
    }

    #[test]
    fn test_unreadable_body_reported_after_booking_checks() {
        let (mut booking, passenger_id, cost) = fixture();
        let unreadable = || Err(AppError::bad_request("Invalid request body"));

        let result = check_reservable(&booking, Uuid::new_v4(), unreadable(), cost);
        assert!(matches!(result, Err(BookingError::NotOwner)));

        booking.status = BookingStatus::Reserved;
        let result = check_reservable(&booking, passenger_id, unreadable(), cost);
        assert!(matches!(result, Err(BookingError::AlreadyReserved)));

        booking.status = BookingStatus::Booked;
        let err = check_reservable(&booking, passenger_id, unreadable(), cost).unwrap_err();
        assert!(matches!(err, BookingError::Request(_)));
        assert_eq!(AppError::from(err).status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_amount_required_and_exact() {
        let (booking, passenger_id, cost) = fixture();

        let result = check_reservable(&booking, passenger_id, Ok(None), cost);
        assert!(matches!(result, Err(BookingError::AmountRequired)));

        let result = check_reservable(
            &booking,
            passenger_id,
            Ok(Some(Money::from_cents(cost.cents() - 1))),
            cost,
        );
        assert!(matches!(result, Err(BookingError::AmountMismatch)));

        let result = check_reservable(
            &booking,
            passenger_id,
            Ok(Some(Money::from_cents(cost.cents() + 100))),
            cost,
        );
        assert!(matches!(result, Err(BookingError::AmountMismatch)));
    }

    #[test]
    fn test_error_mapping() {
        let cases = [
            (BookingError::FlightNotFound(Uuid::nil()), StatusCode::BAD_REQUEST),
            (BookingError::AlreadyBooked, StatusCode::BAD_REQUEST),
            (BookingError::BookingNotFound, StatusCode::NOT_FOUND),
            (BookingError::TicketNotFound, StatusCode::NOT_FOUND),
            (BookingError::NotOwner, StatusCode::FORBIDDEN),
            (BookingError::AlreadyReserved, StatusCode::CONFLICT),
            (BookingError::Cancelled, StatusCode::CONFLICT),
            (BookingError::AmountRequired, StatusCode::BAD_REQUEST),
            (BookingError::AmountMismatch, StatusCode::BAD_REQUEST),
            (
                BookingError::Ticket(TicketError::Exhausted(3)),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status_code(), status);
        }
    }

    #[test]
    fn test_field_errors_carry_messages() {
        let flight_id = Uuid::nil();
        let AppError::Validation { message, errors } =
            AppError::from(BookingError::FlightNotFound(flight_id))
        else {
            panic!("expected a validation error");
        };
        assert_eq!(message, "Could not book the flight");
        assert_eq!(
            errors.unwrap().get("flight_id").unwrap(),
            &[format!("Flight with the id \"{flight_id}\" does not exist")]
        );

        let AppError::Validation { message, errors } =
            AppError::from(BookingError::AmountMismatch)
        else {
            panic!("expected a validation error");
        };
        assert_eq!(message, "Flight not reserved");
        assert_eq!(
            errors.unwrap().get(NON_FIELD_ERRORS).unwrap(),
            &["Amount paid is not equal to the flight cost".to_string()]
        );
    }

    async fn passenger_and_flight(pool: &PgPool) -> (User, Flight) {
        let admin = insert_user(pool, "admin@example.com", true).await;
        let passenger = insert_user(pool, "user@example.com", false).await;
        let flight = insert_flight(pool, admin.id, Utc::now() + Duration::days(3)).await;
        (passenger, flight)
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_create_booking_issues_ticket(pool: PgPool) {
        let (passenger, flight) = passenger_and_flight(&pool).await;
        let (notifier, mut rx) = Notifier::channel();

        let ticket = create_booking(&pool, &notifier, passenger.id, flight.id)
            .await
            .unwrap();

        assert_eq!(ticket.status, BookingStatus::Booked);
        assert_eq!(ticket.ticket_number.len(), 6);
        assert!(matches!(
            rx.try_recv().unwrap(),
            Notification::TicketIssued(t) if t.ticket_number == ticket.ticket_number
        ));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_second_booking_of_same_flight_rejected(pool: PgPool) {
        let (passenger, flight) = passenger_and_flight(&pool).await;
        let (notifier, _rx) = Notifier::channel();

        create_booking(&pool, &notifier, passenger.id, flight.id)
            .await
            .unwrap();

        let result = create_booking(&pool, &notifier, passenger.id, flight.id).await;
        assert!(matches!(result, Err(BookingError::AlreadyBooked)));

        // Concurrent request that got past the existence check
        let result = insert_with_fresh_ticket(&pool, flight.id, passenger.id).await;
        assert!(matches!(result, Err(BookingError::AlreadyBooked)));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_unknown_flight_rejected(pool: PgPool) {
        let passenger = insert_user(&pool, "user@example.com", false).await;
        let (notifier, _rx) = Notifier::channel();
        let flight_id = Uuid::new_v4();

        let result = create_booking(&pool, &notifier, passenger.id, flight_id).await;
        assert!(matches!(result, Err(BookingError::FlightNotFound(id)) if id == flight_id));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_unique_violations_name_their_constraint(pool: PgPool) {
        let (passenger, flight) = passenger_and_flight(&pool).await;
        let other = insert_user(&pool, "other@example.com", false).await;

        Booking::create(
            &pool,
            CreateBookingData {
                flight_id: flight.id,
                passenger_id: passenger.id,
                ticket_number: "EF343F".to_string(),
            },
        )
        .await
        .unwrap();

        let err = Booking::create(
            &pool,
            CreateBookingData {
                flight_id: flight.id,
                passenger_id: other.id,
                ticket_number: "EF343F".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(db::violated_constraint(&err), Some(TICKET_NUMBER_CONSTRAINT));

        let err = Booking::create(
            &pool,
            CreateBookingData {
                flight_id: flight.id,
                passenger_id: passenger.id,
                ticket_number: "ZZ999Z".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(db::violated_constraint(&err), Some(FLIGHT_PASSENGER_CONSTRAINT));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_reservation_lifecycle(pool: PgPool) {
        let (passenger, flight) = passenger_and_flight(&pool).await;
        let (notifier, mut rx) = Notifier::channel();

        let booked = create_booking(&pool, &notifier, passenger.id, flight.id)
            .await
            .unwrap();
        rx.try_recv().unwrap();

        let wrong = Money::from_cents(flight.cost.cents() - 1);
        let result =
            reserve_booking(&pool, &notifier, passenger.id, booked.id, Ok(Some(wrong))).await;
        assert!(matches!(result, Err(BookingError::AmountMismatch)));

        let result =
            reserve_booking(&pool, &notifier, Uuid::new_v4(), booked.id, Ok(Some(flight.cost)))
                .await;
        assert!(matches!(result, Err(BookingError::NotOwner)));

        let reserved =
            reserve_booking(&pool, &notifier, passenger.id, booked.id, Ok(Some(flight.cost)))
                .await
                .unwrap();
        assert_eq!(reserved.status, BookingStatus::Reserved);
        assert_eq!(reserved.amount_paid, flight.cost);
        assert!(reserved.reserved_at.is_some());
        assert!(matches!(
            rx.try_recv().unwrap(),
            Notification::ReservationConfirmed(_)
        ));

        let result =
            reserve_booking(&pool, &notifier, passenger.id, booked.id, Ok(Some(flight.cost)))
                .await;
        assert!(matches!(result, Err(BookingError::AlreadyReserved)));

        // The conditional update refuses a second transition
        let again = Booking::mark_reserved(&pool, booked.id, flight.cost)
            .await
            .unwrap();
        assert!(again.is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_concurrent_reservations_reserve_once(pool: PgPool) {
        let (passenger, flight) = passenger_and_flight(&pool).await;
        let (notifier, _rx) = Notifier::channel();

        let booked = create_booking(&pool, &notifier, passenger.id, flight.id)
            .await
            .unwrap();

        let (first, second) = tokio::join!(
            reserve_booking(&pool, &notifier, passenger.id, booked.id, Ok(Some(flight.cost))),
            reserve_booking(&pool, &notifier, passenger.id, booked.id, Ok(Some(flight.cost))),
        );

        let results = [first, second];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        for result in results {
            if let Err(err) = result {
                assert!(matches!(err, BookingError::AlreadyReserved));
                assert_eq!(AppError::from(err).status_code(), StatusCode::CONFLICT);
            }
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_ticket_lookup_is_scoped_to_passenger(pool: PgPool) {
        let (passenger, flight) = passenger_and_flight(&pool).await;
        let other = insert_user(&pool, "other@example.com", false).await;
        let (notifier, _rx) = Notifier::channel();

        let booked = create_booking(&pool, &notifier, passenger.id, flight.id)
            .await
            .unwrap();

        let found = find_ticket(&pool, passenger.id, &booked.ticket_number)
            .await
            .unwrap();
        assert_eq!(found.id, booked.id);

        let result = find_ticket(&pool, other.id, &booked.ticket_number).await;
        assert!(matches!(result, Err(BookingError::TicketNotFound)));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_bookings_on_date_for_unknown_flight(pool: PgPool) {
        let today = Utc::now().date_naive();
        let result = bookings_on_date(&pool, Uuid::new_v4(), today, BookingStatus::Booked)
            .await
            .unwrap();
        assert!(result.is_none());
    }
}
