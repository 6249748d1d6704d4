use std::sync::Arc;

use lettre::address::AddressError;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;

use crate::config::Config;

#[derive(thiserror::Error, Debug)]
pub enum MailerError {
    #[error("Invalid address: {0}")]
    Address(#[from] AddressError),

    #[error("Failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Outgoing mail delivery.
///
/// Without an SMTP host configured, messages are written to the log instead
/// of being sent, which keeps local development self-contained.
#[derive(Clone)]
pub enum Mailer {
    Smtp {
        transport: Arc<AsyncSmtpTransport<Tokio1Executor>>,
        from: Mailbox,
    },
    Console {
        from: Mailbox,
    },
}

impl Mailer {
    pub fn from_config(config: &Config) -> Result<Self, MailerError> {
        let from: Mailbox = config.mail_from.parse()?;

        let Some(smtp) = &config.smtp else {
            tracing::warn!("SMTP_HOST not set, emails will be logged instead of sent");
            return Ok(Mailer::Console { from });
        };

        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)?.port(smtp.port);

        if let (Some(username), Some(password)) = (&smtp.username, &smtp.password) {
            builder = builder.credentials(Credentials::new(
                username.clone(),
                password.expose_secret().clone(),
            ));
        }

        tracing::info!(host = %smtp.host, port = smtp.port, "SMTP mailer configured");

        Ok(Mailer::Smtp {
            transport: Arc::new(builder.build()),
            from,
        })
    }

    pub fn console(from: Mailbox) -> Self {
        Mailer::Console { from }
    }

    fn from_mailbox(&self) -> &Mailbox {
        match self {
            Mailer::Smtp { from, .. } | Mailer::Console { from } => from,
        }
    }

    /// Builds a multipart (plain text + HTML) message
    pub fn build_message(&self, email: &OutgoingEmail) -> Result<Message, MailerError> {
        let to: Mailbox = email.to.parse()?;

        let message = Message::builder()
            .from(self.from_mailbox().clone())
            .to(to)
            .subject(&email.subject)
            .multipart(MultiPart::alternative_plain_html(
                email.text.clone(),
                email.html.clone(),
            ))?;

        Ok(message)
    }

    pub async fn send(&self, email: &OutgoingEmail) -> Result<(), MailerError> {
        let message = self.build_message(email)?;

        match self {
            Mailer::Smtp { transport, .. } => {
                transport.send(message).await?;
                tracing::info!(to = %email.to, subject = %email.subject, "Email sent");
            }
            Mailer::Console { .. } => {
                tracing::info!(
                    to = %email.to,
                    subject = %email.subject,
                    body = %email.text,
                    "Email (console delivery)"
                );
            }
        }

        Ok(())
    }

    /// Whether the mail relay accepts connections. Console delivery is always up.
    pub async fn check_connection(&self) -> bool {
        match self {
            Mailer::Smtp { transport, .. } => match transport.test_connection().await {
                Ok(connected) => connected,
                Err(e) => {
                    tracing::warn!(error = %e, "SMTP connection check failed");
                    false
                }
            },
            Mailer::Console { .. } => true,
        }
    }

    pub fn is_console(&self) -> bool {
        matches!(self, Mailer::Console { .. })
    }
}
