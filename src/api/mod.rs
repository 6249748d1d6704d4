// API module - HTTP endpoints

pub mod auth;
pub mod bookings;
pub mod flights;
pub mod health;
pub mod middleware;
pub mod response;
