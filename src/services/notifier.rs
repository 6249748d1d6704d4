use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::models::TicketView;
use crate::services::email_templates::{self, RenderError};
use crate::services::mailer::{Mailer, MailerError, OutgoingEmail};

/// Events that result in an email to the passenger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    TicketIssued(TicketView),
    ReservationConfirmed(TicketView),
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::TicketIssued(_) => "ticket_issued",
            Notification::ReservationConfirmed(_) => "reservation_confirmed",
        }
    }

    pub fn ticket(&self) -> &TicketView {
        match self {
            Notification::TicketIssued(ticket) | Notification::ReservationConfirmed(ticket) => {
                ticket
            }
        }
    }

    pub fn render(&self) -> Result<OutgoingEmail, RenderError> {
        match self {
            Notification::TicketIssued(ticket) => email_templates::ticket_email(ticket),
            Notification::ReservationConfirmed(ticket) => {
                email_templates::reservation_email(ticket)
            }
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum NotificationError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Mail(#[from] MailerError),
}

/// Hands notifications to a background worker so that request handlers
/// never wait on mail delivery
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl Notifier {
    /// Starts the delivery worker. The worker stops once every `Notifier`
    /// clone has been dropped and the queue is drained.
    pub fn spawn(mailer: Mailer) -> (Self, JoinHandle<()>) {
        let (notifier, rx) = Self::channel();
        let handle = tokio::spawn(run_worker(mailer, rx));
        (notifier, handle)
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queues a notification. Failures are logged and never surface to the caller.
    pub fn dispatch(&self, notification: Notification) {
        let kind = notification.kind();
        let ticket_number = notification.ticket().ticket_number.clone();

        if self.tx.send(notification).is_err() {
            tracing::warn!(
                kind,
                ticket_number = %ticket_number,
                "Notification worker is not running, dropping notification"
            );
        }
    }
}

async fn run_worker(mailer: Mailer, mut rx: mpsc::UnboundedReceiver<Notification>) {
    tracing::info!("Notification worker started");

    while let Some(notification) = rx.recv().await {
        if let Err(e) = deliver(&mailer, &notification).await {
            tracing::error!(
                kind = notification.kind(),
                ticket_number = %notification.ticket().ticket_number,
                error = %e,
                "Failed to deliver notification"
            );
        }
    }

    tracing::info!("Notification worker stopped");
}

async fn deliver(mailer: &Mailer, notification: &Notification) -> Result<(), NotificationError> {
    let email = notification.render()?;
    mailer.send(&email).await?;
    Ok(())
}
