use std::collections::HashMap;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, Query, State,
    },
    middleware,
    routing::{get, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::api::middleware::{
    auth::{require_auth, AuthenticatedUser},
    session::AppState,
};
use crate::api::response::ApiResponse;
use crate::error::{AppError, FieldErrors, Result};
use crate::models::{Booking, Money, TicketView};
use crate::services::booking_query::BookingQuery;
use crate::services::booking_service;
use crate::services::notifier::Notifier;
use crate::services::validators::REQUIRED;

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub flight_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ReserveBookingRequest {
    pub amount_paid: Option<Money>,
}

/// Bookings of a flight on a day; the list itself is only shown to admins
#[derive(Debug, Serialize)]
pub struct FlightDayBookings {
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bookings: Option<Vec<Booking>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BookingLookup {
    Ticket(TicketView),
    FlightDay(FlightDayBookings),
}

async fn create_booking(
    State(pool): State<PgPool>,
    State(notifier): State<Notifier>,
    Extension(current): Extension<AuthenticatedUser>,
    payload: std::result::Result<Json<CreateBookingRequest>, JsonRejection>,
) -> Result<ApiResponse<TicketView>> {
    let Json(request) = payload?;

    let flight_id = request.flight_id.ok_or_else(|| {
        AppError::validation(
            "Could not book the flight",
            FieldErrors::single("flight_id", REQUIRED),
        )
    })?;

    let ticket =
        booking_service::create_booking(&pool, &notifier, current.user_id, flight_id).await?;

    Ok(ApiResponse::created("Ticket booked", ticket))
}

async fn find_bookings(
    State(pool): State<PgPool>,
    Extension(current): Extension<AuthenticatedUser>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<ApiResponse<BookingLookup>> {
    match BookingQuery::parse(&params)? {
        BookingQuery::Ticket(ticket_number) => {
            let ticket =
                booking_service::find_ticket(&pool, current.user_id, &ticket_number).await?;
            Ok(ApiResponse::ok("Booking retrieved", BookingLookup::Ticket(ticket)))
        }
        BookingQuery::FlightDay {
            flight_id,
            date,
            status,
        } => {
            let bookings = booking_service::bookings_on_date(&pool, flight_id, date, status)
                .await?
                .ok_or_else(|| AppError::NotFound("Flight not found".to_string()))?;

            let is_admin = current.is_admin(&pool).await?;
            let result = FlightDayBookings {
                count: bookings.len(),
                bookings: is_admin.then_some(bookings),
            };
            Ok(ApiResponse::ok("Flight retrieved", BookingLookup::FlightDay(result)))
        }
    }
}

/// Pays for a booking, moving it to Reserved
async fn reserve_booking(
    State(pool): State<PgPool>,
    State(notifier): State<Notifier>,
    Extension(current): Extension<AuthenticatedUser>,
    path: std::result::Result<Path<Uuid>, PathRejection>,
    payload: std::result::Result<Json<ReserveBookingRequest>, JsonRejection>,
) -> Result<ApiResponse<TicketView>> {
    let Path(booking_id) =
        path.map_err(|_| AppError::NotFound("Booking not found".to_string()))?;
    // Body errors are reported after the ownership and status checks
    let amount_paid = payload
        .map(|Json(request)| request.amount_paid)
        .map_err(AppError::from);

    let ticket = booking_service::reserve_booking(
        &pool,
        &notifier,
        current.user_id,
        booking_id,
        amount_paid,
    )
    .await?;

    Ok(ApiResponse::ok("Flight reserved", ticket))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/bookings", get(find_bookings).post(create_booking))
        .route("/bookings/:id", put(reserve_booking))
        .route_layer(middleware::from_fn(require_auth))
}
