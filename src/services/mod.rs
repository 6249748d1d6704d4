// Services module - Business logic

pub mod accounts;
pub mod booking_query;
pub mod booking_service;
pub mod email_templates;
pub mod flight_rules;
pub mod mailer;
pub mod notifier;
pub mod password;
pub mod qr_generator;
pub mod ticket;
pub mod validators;

#[cfg(test)]
pub(crate) mod test_support;
