use std::collections::HashMap;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::{AppError, FieldErrors};
use crate::models::BookingStatus;
use crate::services::ticket;

const ALLOWED_PARAMS: [&str; 4] = ["ticket", "flight", "date", "status"];

/// A validated `GET /bookings` filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingQuery {
    /// Exact ticket lookup for the requesting passenger
    Ticket(String),

    /// Bookings of a flight in a given status on a given day
    FlightDay {
        flight_id: Uuid,
        date: NaiveDate,
        status: BookingStatus,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    Missing,
    UnknownParams(Vec<String>),
    UnsupportedCombination,
    InvalidTicket,
    InvalidValues(FieldErrors),
}

impl From<QueryError> for AppError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::Missing => AppError::bad_request("Query params required"),
            QueryError::UnknownParams(keys) => {
                AppError::bad_request(format!("Invalid query params - {}", keys.join(", ")))
            }
            QueryError::UnsupportedCombination => AppError::bad_request(
                "Unsupported query params combination: provide flight, date and status",
            ),
            QueryError::InvalidTicket => AppError::validation(
                "Invalid ticket number",
                FieldErrors::single(
                    "ticket",
                    "Ticket number invalid please provide a valid ticket",
                ),
            ),
            QueryError::InvalidValues(errors) => {
                AppError::validation("Provide valid query parameters", errors)
            }
        }
    }
}

impl BookingQuery {
    pub fn parse(params: &HashMap<String, String>) -> Result<Self, QueryError> {
        if params.is_empty() {
            return Err(QueryError::Missing);
        }

        let mut unknown: Vec<String> = params
            .keys()
            .filter(|key| !ALLOWED_PARAMS.contains(&key.as_str()))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            unknown.sort();
            return Err(QueryError::UnknownParams(unknown));
        }

        match (
            params.get("ticket"),
            params.get("flight"),
            params.get("date"),
            params.get("status"),
        ) {
            (Some(ticket), None, None, None) => {
                if ticket::is_valid_ticket_number(ticket) {
                    Ok(BookingQuery::Ticket(ticket.clone()))
                } else {
                    Err(QueryError::InvalidTicket)
                }
            }
            (None, Some(flight), Some(date), Some(status)) => parse_flight_day(flight, date, status),
            _ => Err(QueryError::UnsupportedCombination),
        }
    }
}

fn parse_flight_day(flight: &str, date: &str, status: &str) -> Result<BookingQuery, QueryError> {
    let mut errors = FieldErrors::new();

    let flight_id = Uuid::parse_str(flight).ok();
    if flight_id.is_none() {
        errors.add("flight", "Must be a valid flight id");
    }

    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok();
    if date.is_none() {
        errors.add("date", "Date has wrong format. Use YYYY-MM-DD.");
    }

    let status = match status.parse::<BookingStatus>() {
        Ok(status @ (BookingStatus::Booked | BookingStatus::Reserved)) => Some(status),
        _ => {
            errors.add("status", "Status must be one of: Booked, Reserved");
            None
        }
    };

    match (flight_id, date, status) {
        (Some(flight_id), Some(date), Some(status)) => Ok(BookingQuery::FlightDay {
            flight_id,
            date,
            status,
        }),
        _ => Err(QueryError::InvalidValues(errors)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_no_params() {
        assert_eq!(BookingQuery::parse(&params(&[])), Err(QueryError::Missing));
    }

    #[test]
    fn test_unknown_params_reported_first() {
        let result = BookingQuery::parse(&params(&[("ticket", "FT533F"), ("wrong_key", "this")]));
        assert_eq!(
            result,
            Err(QueryError::UnknownParams(vec!["wrong_key".to_string()]))
        );

        let message = AppError::from(result.unwrap_err()).to_string();
        assert_eq!(message, "Invalid query params - wrong_key");
    }

    #[test]
    fn test_ticket_lookup() {
        assert_eq!(
            BookingQuery::parse(&params(&[("ticket", "EF343F")])),
            Ok(BookingQuery::Ticket("EF343F".to_string()))
        );
        assert_eq!(
            BookingQuery::parse(&params(&[("ticket", "FR56@D$")])),
            Err(QueryError::InvalidTicket)
        );
    }

    #[test]
    fn test_flight_day_lookup() {
        let flight_id = Uuid::new_v4();
        let query = BookingQuery::parse(&params(&[
            ("flight", &flight_id.to_string()),
            ("date", "2019-04-12"),
            ("status", "Reserved"),
        ]))
        .unwrap();

        assert_eq!(
            query,
            BookingQuery::FlightDay {
                flight_id,
                date: NaiveDate::from_ymd_opt(2019, 4, 12).unwrap(),
                status: BookingStatus::Reserved,
            }
        );
    }

    #[test]
    fn test_flight_day_invalid_values() {
        let flight_id = Uuid::new_v4();
        let result = BookingQuery::parse(&params(&[
            ("flight", &flight_id.to_string()),
            ("date", "Wrong_date"),
            ("status", "Wrong_status"),
        ]));

        let Err(QueryError::InvalidValues(errors)) = result else {
            panic!("expected invalid values, got {result:?}");
        };
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["date", "status"]);
    }

    #[test]
    fn test_cancelled_status_not_queryable() {
        let result = BookingQuery::parse(&params(&[
            ("flight", &Uuid::new_v4().to_string()),
            ("date", "2019-04-12"),
            ("status", "Cancelled"),
        ]));
        assert!(matches!(result, Err(QueryError::InvalidValues(_))));
    }

    #[test]
    fn test_mixed_combinations_rejected() {
        for pairs in [
            vec![("ticket", "FR56@D$"), ("date", "Wrong_date"), ("status", "Reserved")],
            vec![("flight", "x"), ("date", "2019-04-12")],
            vec![("status", "Booked")],
            vec![
                ("ticket", "EF343F"),
                ("flight", "x"),
                ("date", "2019-04-12"),
                ("status", "Booked"),
            ],
        ] {
            assert_eq!(
                BookingQuery::parse(&params(&pairs)),
                Err(QueryError::UnsupportedCombination)
            );
        }
    }
}
