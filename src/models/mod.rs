//! Domain models for the StayBook backend.
//!
//! Database-backed rows for the booking ledger and the read-only catalog
//! data (users, hotels, rooms) the ledger consults.

pub mod booking;
pub mod hotel;
pub mod room;
pub mod user;

// Re-export all models for convenient access
pub use booking::{Booking, BookingStatus, HotelDashboard, NewBooking};
pub use hotel::Hotel;
pub use room::Room;
pub use user::User;
