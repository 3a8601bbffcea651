pub mod audit;
pub mod availability;
pub mod booking_service;
pub mod payment_service;
pub mod retry;
pub mod sweeper;

pub use audit::AuditTrailService;
pub use availability::AvailabilityOracle;
pub use booking_service::BookingService;
pub use payment_service::{CheckoutUrls, PaymentService, STRIPE_PAYMENT_METHOD};
pub use sweeper::{SweepReport, Sweeper, SweeperHandle};
