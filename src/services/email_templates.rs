use askama::Template;
use chrono::{DateTime, Utc};

use crate::models::TicketView;
use crate::services::mailer::OutgoingEmail;
use crate::services::qr_generator::{self, QrGenerationError};

#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    #[error(transparent)]
    Qr(#[from] QrGenerationError),
}

/// Ticket fields pre-formatted for display
#[derive(Debug, Clone)]
struct TicketDetails {
    passenger_name: String,
    ticket_number: String,
    flight_number: String,
    departing: String,
    departing_airport: String,
    destination: String,
    destination_airport: String,
    departure_date: String,
    departure_time: String,
    arrival_date: String,
    arrival_time: String,
    cost: String,
    amount_paid: String,
}

impl From<&TicketView> for TicketDetails {
    fn from(ticket: &TicketView) -> Self {
        let flight = &ticket.flight;
        Self {
            passenger_name: ticket.passenger.full_name(),
            ticket_number: ticket.ticket_number.clone(),
            flight_number: flight.flight_number.clone(),
            departing: flight.departing.clone(),
            departing_airport: flight.departing_airport.clone(),
            destination: flight.destination.clone(),
            destination_airport: flight.destination_airport.clone(),
            departure_date: format_date(flight.departure_at),
            departure_time: format_time(flight.departure_at),
            arrival_date: format_date(flight.arrival_at),
            arrival_time: format_time(flight.arrival_at),
            cost: flight.cost.to_string(),
            amount_paid: ticket.amount_paid.to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "emails/ticket.html")]
struct TicketHtml<'a> {
    t: &'a TicketDetails,
    qr_svg: &'a str,
}

#[derive(Template)]
#[template(path = "emails/ticket.txt")]
struct TicketText<'a> {
    t: &'a TicketDetails,
}

#[derive(Template)]
#[template(path = "emails/reservation.html")]
struct ReservationHtml<'a> {
    t: &'a TicketDetails,
    qr_svg: &'a str,
}

#[derive(Template)]
#[template(path = "emails/reservation.txt")]
struct ReservationText<'a> {
    t: &'a TicketDetails,
}

/// e.g. "Fri, 12 Apr, 2019"
pub fn format_date(value: DateTime<Utc>) -> String {
    value.format("%a, %d %b, %Y").to_string()
}

/// e.g. "9:05 AM"
pub fn format_time(value: DateTime<Utc>) -> String {
    value.format("%-I:%M %p").to_string()
}

/// E-ticket sent after a booking is created
pub fn ticket_email(ticket: &TicketView) -> Result<OutgoingEmail, RenderError> {
    let details = TicketDetails::from(ticket);
    let qr_svg = qr_generator::generate_ticket_qr_svg(ticket)?;

    Ok(OutgoingEmail {
        to: ticket.passenger.email.clone(),
        subject: format!("eTicket - Flight to {}", details.destination_airport),
        html: TicketHtml {
            t: &details,
            qr_svg: &qr_svg,
        }
        .render()?,
        text: TicketText { t: &details }.render()?,
    })
}

/// Confirmation sent after a booking is paid
pub fn reservation_email(ticket: &TicketView) -> Result<OutgoingEmail, RenderError> {
    let details = TicketDetails::from(ticket);
    let qr_svg = qr_generator::generate_ticket_qr_svg(ticket)?;

    Ok(OutgoingEmail {
        to: ticket.passenger.email.clone(),
        subject: format!("Reservation confirmed - Flight {}", details.flight_number),
        html: ReservationHtml {
            t: &details,
            qr_svg: &qr_svg,
        }
        .render()?,
        text: ReservationText { t: &details }.render()?,
    })
}
