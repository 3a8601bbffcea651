use crate::clock::Clock;
use crate::repositories::{HotelDirectory, UserDirectory};
use crate::services::{BookingService, PaymentService, Sweeper};
use std::sync::Arc;

/// Webhook verification settings
#[derive(Debug, Clone)]
pub struct WebhookSettings {
    pub secret: String,
    pub tolerance_secs: i64,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub bookings: Arc<BookingService>,
    pub payments: Arc<PaymentService>,
    pub sweeper: Arc<Sweeper>,
    /// Used to resolve which owner manages a booking's hotel
    pub hotels: Arc<dyn HotelDirectory>,
    /// Roles gate the manual sweep routes
    pub users: Arc<dyn UserDirectory>,
    pub webhook: WebhookSettings,
    pub clock: Arc<dyn Clock>,
}
