use std::future::Future;

use rand::Rng;

pub const TICKET_LENGTH: usize = 6;

/// Upper bound on rejection-sampling rounds before giving up
pub const MAX_TICKET_ATTEMPTS: usize = 64;

const TICKET_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[derive(thiserror::Error, Debug)]
pub enum TicketError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Could not find a free ticket number after {0} attempts")]
    Exhausted(usize),
}

/// Draws a random ticket number from uppercase letters and digits
pub fn generate_ticket_number<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..TICKET_LENGTH)
        .map(|_| TICKET_CHARSET[rng.gen_range(0..TICKET_CHARSET.len())] as char)
        .collect()
}

/// Whether `value` has the shape of a ticket number (any case)
pub fn is_valid_ticket_number(value: &str) -> bool {
    value.len() == TICKET_LENGTH && value.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Draws ticket numbers until `is_taken` reports one as free
pub async fn issue_ticket_number<F, Fut>(mut is_taken: F) -> Result<String, TicketError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool, sqlx::Error>>,
{
    for attempt in 1..=MAX_TICKET_ATTEMPTS {
        let candidate = generate_ticket_number(&mut rand::thread_rng());

        if !is_taken(candidate.clone()).await? {
            return Ok(candidate);
        }

        tracing::debug!(attempt, "Ticket number collision, drawing again");
    }

    Err(TicketError::Exhausted(MAX_TICKET_ATTEMPTS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_generated_tickets_have_expected_shape() {
        let mut rng = rand::thread_rng();
        for _ in 0..500 {
            let ticket = generate_ticket_number(&mut rng);
            assert_eq!(ticket.len(), TICKET_LENGTH);
            assert!(ticket
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
            assert!(is_valid_ticket_number(&ticket));
        }
    }

    #[test]
    fn test_ticket_validation() {
        assert!(is_valid_ticket_number("EF343F"));
        assert!(is_valid_ticket_number("none01"));
        assert!(!is_valid_ticket_number("FR56@D$"));
        assert!(!is_valid_ticket_number("ABC12"));
        assert!(!is_valid_ticket_number("ABC1234"));
        assert!(!is_valid_ticket_number("ÄBC123"));
    }

    #[tokio::test]
    async fn test_issue_retries_on_collision() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let calls = Arc::clone(&seen);

        let ticket = issue_ticket_number(move |candidate| {
            let calls = Arc::clone(&calls);
            async move {
                let mut calls = calls.lock().unwrap();
                calls.push(candidate);
                // First two draws collide
                Ok(calls.len() <= 2)
            }
        })
        .await
        .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen.last().unwrap(), &ticket);
    }

    #[tokio::test]
    async fn test_issue_gives_up_when_everything_collides() {
        let result = issue_ticket_number(|_| async { Ok(true) }).await;
        assert!(matches!(result, Err(TicketError::Exhausted(MAX_TICKET_ATTEMPTS))));
    }

    #[tokio::test]
    async fn test_issue_propagates_database_errors() {
        let result = issue_ticket_number(|_| async { Err(sqlx::Error::PoolTimedOut) }).await;
        assert!(matches!(result, Err(TicketError::Database(_))));
    }

    #[tokio::test]
    async fn test_issued_tickets_avoid_existing_ones() {
        let existing: HashSet<String> = (0..50)
            .map(|_| generate_ticket_number(&mut rand::thread_rng()))
            .collect();

        for _ in 0..50 {
            let taken = existing.clone();
            let ticket = issue_ticket_number(move |candidate| {
                let collides = taken.contains(&candidate);
                async move { Ok(collides) }
            })
            .await
            .unwrap();
            assert!(!existing.contains(&ticket));
        }
    }
}
