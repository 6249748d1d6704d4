use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    middleware,
    routing::get,
    Extension, Json, Router,
};
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::api::middleware::{
    auth::{require_auth, AuthenticatedUser},
    session::AppState,
};
use crate::api::response::ApiResponse;
use crate::error::{AppError, Result};
use crate::models::Flight;
use crate::services::flight_rules::{self, FlightInput};

fn flight_not_found() -> AppError {
    AppError::NotFound("Flight not found".to_string())
}

/// Malformed ids can never match a flight
fn flight_id(path: std::result::Result<Path<Uuid>, PathRejection>) -> Result<Uuid> {
    path.map(|Path(id)| id).map_err(|_| flight_not_found())
}

async fn create_flight(
    State(pool): State<PgPool>,
    Extension(current): Extension<AuthenticatedUser>,
    payload: std::result::Result<Json<FlightInput>, JsonRejection>,
) -> Result<ApiResponse<Flight>> {
    current.ensure_admin(&pool).await?;
    let Json(input) = payload?;

    let data = flight_rules::prepare_new_flight(input, Utc::now())
        .map_err(|errors| AppError::validation("Could not create the flight", errors))?;

    let flight = Flight::create(&pool, current.user_id, data).await?;
    tracing::info!(flight_id = %flight.id, flight_number = %flight.flight_number, "Flight created");

    Ok(ApiResponse::created("flight created", flight))
}

async fn list_flights(State(pool): State<PgPool>) -> Result<ApiResponse<Vec<Flight>>> {
    let flights = Flight::list_all(&pool).await?;
    Ok(ApiResponse::ok("Flights retrieved", flights))
}

async fn show_flight(
    State(pool): State<PgPool>,
    path: std::result::Result<Path<Uuid>, PathRejection>,
) -> Result<ApiResponse<Flight>> {
    let id = flight_id(path)?;
    let flight = Flight::find_by_id(&pool, id)
        .await?
        .ok_or_else(flight_not_found)?;

    Ok(ApiResponse::ok("Flight retrieved", flight))
}

/// Partial update; omitted fields keep their stored values
async fn update_flight(
    State(pool): State<PgPool>,
    Extension(current): Extension<AuthenticatedUser>,
    path: std::result::Result<Path<Uuid>, PathRejection>,
    payload: std::result::Result<Json<FlightInput>, JsonRejection>,
) -> Result<ApiResponse<Flight>> {
    current.ensure_admin(&pool).await?;
    let id = flight_id(path)?;
    let Json(input) = payload?;

    let existing = Flight::find_by_id(&pool, id)
        .await?
        .ok_or_else(flight_not_found)?;

    let data = flight_rules::prepare_flight_update(&existing, input, Utc::now())
        .map_err(|errors| AppError::validation("Could not update flight", errors))?;

    let flight = Flight::update(&pool, id, data)
        .await?
        .ok_or_else(flight_not_found)?;
    tracing::info!(flight_id = %flight.id, "Flight updated");

    Ok(ApiResponse::ok("Flight updated", flight))
}

async fn delete_flight(
    State(pool): State<PgPool>,
    Extension(current): Extension<AuthenticatedUser>,
    path: std::result::Result<Path<Uuid>, PathRejection>,
) -> Result<ApiResponse<()>> {
    current.ensure_admin(&pool).await?;
    let id = flight_id(path)?;

    if !Flight::delete(&pool, id).await? {
        return Err(flight_not_found());
    }
    tracing::info!(flight_id = %id, "Flight deleted");

    Ok(ApiResponse::message("Flight deleted"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/flights", get(list_flights).post(create_flight))
        .route(
            "/flights/:id",
            get(show_flight).put(update_flight).delete(delete_flight),
        )
        .route_layer(middleware::from_fn(require_auth))
}
