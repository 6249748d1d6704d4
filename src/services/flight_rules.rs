use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::error::{FieldErrors, NON_FIELD_ERRORS};
use crate::models::flight::{Flight, FlightData};
use crate::models::Money;
use crate::services::validators::{self, REQUIRED};

/// Minimum gap between "now" and a flight's departure
pub const MIN_DEPARTURE_NOTICE_HOURS: i64 = 24;

const MAX_FLIGHT_NUMBER_LEN: usize = 20;
const MAX_CITY_LEN: usize = 32;

/// Flight fields as sent by clients. Every field is optional so that missing
/// values can be reported per field on create and left untouched on update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlightInput {
    pub flight_number: Option<String>,
    pub departure_at: Option<DateTime<Utc>>,
    pub arrival_at: Option<DateTime<Utc>>,
    pub cost: Option<Money>,
    pub departing: Option<String>,
    pub departing_airport: Option<String>,
    pub destination: Option<String>,
    pub destination_airport: Option<String>,
}

/// Builds a new flight from a full set of fields
pub fn prepare_new_flight(input: FlightInput, now: DateTime<Utc>) -> Result<FlightData, FieldErrors> {
    let mut errors = FieldErrors::new();

    let flight_number = require(&mut errors, "flight_number", input.flight_number);
    let departure_at = require(&mut errors, "departure_at", input.departure_at);
    let arrival_at = require(&mut errors, "arrival_at", input.arrival_at);
    let cost = require(&mut errors, "cost", input.cost);
    let departing = require(&mut errors, "departing", input.departing);
    let departing_airport = require(&mut errors, "departing_airport", input.departing_airport);
    let destination = require(&mut errors, "destination", input.destination);
    let destination_airport =
        require(&mut errors, "destination_airport", input.destination_airport);

    let (
        Some(flight_number),
        Some(departure_at),
        Some(arrival_at),
        Some(cost),
        Some(departing),
        Some(departing_airport),
        Some(destination),
        Some(destination_airport),
    ) = (
        flight_number,
        departure_at,
        arrival_at,
        cost,
        departing,
        departing_airport,
        destination,
        destination_airport,
    )
    else {
        return Err(errors);
    };

    let data = normalize(FlightData {
        flight_number,
        departure_at,
        arrival_at,
        cost,
        departing,
        departing_airport,
        destination,
        destination_airport,
    });

    validate(&data, now, true)?;
    Ok(data)
}

/// Applies a partial update on top of an existing flight and re-validates the result
pub fn prepare_flight_update(
    existing: &Flight,
    input: FlightInput,
    now: DateTime<Utc>,
) -> Result<FlightData, FieldErrors> {
    let mut data = FlightData::from(existing);
    let departure_changed = input
        .departure_at
        .is_some_and(|departure_at| departure_at != existing.departure_at);

    if let Some(flight_number) = input.flight_number {
        data.flight_number = flight_number;
    }
    if let Some(departure_at) = input.departure_at {
        data.departure_at = departure_at;
    }
    if let Some(arrival_at) = input.arrival_at {
        data.arrival_at = arrival_at;
    }
    if let Some(cost) = input.cost {
        data.cost = cost;
    }
    if let Some(departing) = input.departing {
        data.departing = departing;
    }
    if let Some(departing_airport) = input.departing_airport {
        data.departing_airport = departing_airport;
    }
    if let Some(destination) = input.destination {
        data.destination = destination;
    }
    if let Some(destination_airport) = input.destination_airport {
        data.destination_airport = destination_airport;
    }

    let data = normalize(data);
    validate(&data, now, departure_changed)?;
    Ok(data)
}

/// Checks the flight invariants. The departure notice period is only enforced
/// when `check_notice` is set, so that flights close to departure can still
/// have other fields corrected.
pub fn validate(
    data: &FlightData,
    now: DateTime<Utc>,
    check_notice: bool,
) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    if !validators::is_alphanumeric(&data.flight_number) {
        errors.add("flight_number", "Must be only alphanumeric characters");
    } else if data.flight_number.len() > MAX_FLIGHT_NUMBER_LEN {
        errors.add(
            "flight_number",
            format!("Ensure this field has no more than {MAX_FLIGHT_NUMBER_LEN} characters."),
        );
    }

    for (field, value) in [("departing", &data.departing), ("destination", &data.destination)] {
        if value.is_empty() {
            errors.add(field, "This field may not be blank.");
        } else if value.chars().count() > MAX_CITY_LEN {
            errors.add(
                field,
                format!("Ensure this field has no more than {MAX_CITY_LEN} characters."),
            );
        }
    }

    for (field, value) in [
        ("departing_airport", &data.departing_airport),
        ("destination_airport", &data.destination_airport),
    ] {
        if !validators::is_airport_code(value) {
            errors.add(field, "Must be a 3-letter airport code");
        }
    }

    if check_notice && data.departure_at < now + Duration::hours(MIN_DEPARTURE_NOTICE_HOURS) {
        errors.add("departure_at", "Departure must be at least 24 hours ahead");
    }

    if data.arrival_at <= data.departure_at {
        errors.add(NON_FIELD_ERRORS, "Arrival must occur after departure");
    }

    errors.into_result()
}

fn require<T>(errors: &mut FieldErrors, field: &str, value: Option<T>) -> Option<T> {
    if value.is_none() {
        errors.add(field, REQUIRED);
    }
    value
}

fn normalize(mut data: FlightData) -> FlightData {
    data.flight_number = data.flight_number.trim().to_string();
    data.departing = data.departing.trim().to_string();
    data.destination = data.destination.trim().to_string();
    data.departing_airport = data.departing_airport.trim().to_ascii_uppercase();
    data.destination_airport = data.destination_airport.trim().to_ascii_uppercase();
    data
}
