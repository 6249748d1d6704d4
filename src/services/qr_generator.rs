use chrono::{DateTime, Utc};
use qrcode::render::svg;
use qrcode::QrCode;
use serde::{Deserialize, Serialize};

use crate::models::TicketView;

#[derive(thiserror::Error, Debug)]
pub enum QrGenerationError {
    #[error("QR code generation failed: {0}")]
    QrCodeError(#[from] qrcode::types::QrError),

    #[error("JSON serialization failed: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Data encoded in the QR code printed on an e-ticket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardingPassPayload {
    pub ticket_number: String,
    pub flight_number: String,
    pub passenger: String,
    pub from: String,
    pub to: String,
    pub departure_at: DateTime<Utc>,
}

impl From<&TicketView> for BoardingPassPayload {
    fn from(ticket: &TicketView) -> Self {
        Self {
            ticket_number: ticket.ticket_number.clone(),
            flight_number: ticket.flight.flight_number.clone(),
            passenger: ticket.passenger.full_name(),
            from: ticket.flight.departing_airport.clone(),
            to: ticket.flight.destination_airport.clone(),
            departure_at: ticket.flight.departure_at,
        }
    }
}

/// Renders the ticket's boarding-pass payload as an inline SVG QR code
pub fn generate_ticket_qr_svg(ticket: &TicketView) -> Result<String, QrGenerationError> {
    let payload = BoardingPassPayload::from(ticket);
    let json_str = serde_json::to_string(&payload)?;

    let code = QrCode::new(json_str.as_bytes())?;
    let svg = code
        .render::<svg::Color>()
        .min_dimensions(200, 200)
        .build();

    Ok(svg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::sample_ticket;

    #[test]
    fn test_payload_from_ticket() {
        let ticket = sample_ticket();
        let payload = BoardingPassPayload::from(&ticket);

        assert_eq!(payload.ticket_number, ticket.ticket_number);
        assert_eq!(payload.passenger, "John West");
        assert_eq!(payload.to, "DXB");
    }

    #[test]
    fn test_qr_svg_generation() {
        let svg = generate_ticket_qr_svg(&sample_ticket()).unwrap();

        assert!(svg.contains("<svg"));
        assert!(svg.contains("</svg>"));
    }
}
