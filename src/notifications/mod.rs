//! Guest notifications.
//!
//! Lifecycle changes are announced to the booking's guest through a
//! [`Notifier`]. Delivery is fire-and-forget: the dispatcher resolves the
//! recipient and sends on a spawned task, and a failed send is logged and
//! never propagated to the operation that triggered it.

pub mod smtp;
pub mod templates;

pub use smtp::SmtpNotifier;
pub use templates::BookingNotice;

use crate::models::Booking;
use crate::repositories::{HotelDirectory, UserDirectory};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A rendered message ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipient: String,
    pub subject: String,
    pub html_body: String,
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("Delivery failed: {0}")]
    Transport(String),
}

/// Delivery channel for guest notifications
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Writes notifications to the log instead of delivering them
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        info!(
            to = %notification.recipient,
            subject = %notification.subject,
            "Notification (not delivered, SMTP disabled)"
        );
        Ok(())
    }
}

/// Resolves the guest of a booking and delivers a notice in the background
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    users: Arc<dyn UserDirectory>,
    hotels: Arc<dyn HotelDirectory>,
}

impl NotificationDispatcher {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        users: Arc<dyn UserDirectory>,
        hotels: Arc<dyn HotelDirectory>,
    ) -> Self {
        Self {
            notifier,
            users,
            hotels,
        }
    }

    /// Spawn delivery of `notice` for `booking`. The handle is only useful to
    /// tests; callers normally drop it.
    pub fn dispatch(&self, booking: &Booking, notice: BookingNotice) -> JoinHandle<()> {
        let this = self.clone();
        let booking = booking.clone();

        tokio::spawn(async move {
            if let Err(e) = this.deliver(&booking, notice).await {
                warn!(
                    booking_id = %booking.id,
                    notice = notice.as_str(),
                    "Failed to notify guest: {}", e
                );
            }
        })
    }

    async fn deliver(&self, booking: &Booking, notice: BookingNotice) -> Result<(), NotifyError> {
        let user = match self.users.find_user(&booking.user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                debug!(user_id = %booking.user_id, "No contact details for guest, skipping notification");
                return Ok(());
            }
            Err(e) => return Err(NotifyError::Transport(format!("recipient lookup failed: {}", e))),
        };

        // The hotel name only decorates the message
        let hotel = self.hotels.find_hotel(booking.hotel_id).await.ok().flatten();

        let notification = templates::render(notice, booking, &user, hotel.as_ref());
        self.notifier.send(&notification).await?;

        debug!(booking_id = %booking.id, notice = notice.as_str(), "Guest notified");
        Ok(())
    }
}
