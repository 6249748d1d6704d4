// Models module - Database entity representations

pub mod booking;
pub mod flight;
pub mod money;
pub mod user;

pub use booking::{Booking, BookingStatus, TicketView};
pub use flight::Flight;
pub use money::Money;
pub use user::User;
