use super::Notification;
use crate::models::{Booking, Hotel, User};

/// Which lifecycle change a guest is told about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingNotice {
    /// Booking created, payment still required
    Created,
    PaymentReceived,
    /// Administrative status change
    StatusChanged,
    Cancelled,
    /// Expired by the sweeper for non-payment
    AutoCancelled,
}

impl BookingNotice {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingNotice::Created => "created",
            BookingNotice::PaymentReceived => "payment_received",
            BookingNotice::StatusChanged => "status_changed",
            BookingNotice::Cancelled => "cancelled",
            BookingNotice::AutoCancelled => "auto_cancelled",
        }
    }

    fn subject(&self) -> &'static str {
        match self {
            BookingNotice::Created => "Booking Confirmation",
            BookingNotice::PaymentReceived => "Payment Received",
            BookingNotice::StatusChanged => "Booking Status Updated",
            BookingNotice::Cancelled => "Booking Cancelled",
            BookingNotice::AutoCancelled => "Booking Cancelled: Payment Not Received",
        }
    }

    fn lead(&self, booking: &Booking) -> String {
        match self {
            BookingNotice::Created => {
                "Your reservation is on hold. Please complete the payment to confirm it.".to_string()
            }
            BookingNotice::PaymentReceived => {
                "We received your payment. Your reservation is confirmed.".to_string()
            }
            BookingNotice::StatusChanged => {
                format!("The hotel updated your reservation. It is now <strong>{}</strong>.", booking.status)
            }
            BookingNotice::Cancelled => "Your reservation has been cancelled.".to_string(),
            BookingNotice::AutoCancelled => {
                "Your reservation was cancelled because payment was not completed in time.".to_string()
            }
        }
    }
}

/// Render the HTML message for a notice
pub fn render(notice: BookingNotice, booking: &Booking, user: &User, hotel: Option<&Hotel>) -> Notification {
    let hotel_line = hotel
        .map(|h| {
            format!(
                "<li><strong>Hotel Name:</strong> {}</li>\n        <li><strong>Location:</strong> {}</li>",
                h.name, h.address
            )
        })
        .unwrap_or_default();

    let reason_line = booking
        .cancellation_reason
        .as_deref()
        .map(|r| format!("<li><strong>Reason:</strong> {}</li>", r))
        .unwrap_or_default();

    let html_body = format!(
        r#"
      <h1>{subject}</h1>
      <p>Dear {username},</p>
      <p>{lead}</p>
      <ul>
        <li><strong>Booking ID:</strong> {id}</li>
        {hotel_line}
        <li><strong>Check-in:</strong> {check_in}</li>
        <li><strong>Check-out:</strong> {check_out}</li>
        <li><strong>Guests:</strong> {guests}</li>
        <li><strong>Booking Amount:</strong> {total}</li>
        {reason_line}
      </ul>
      <p>If you have any questions, feel free to contact us.</p>
      <p>Best regards,</p>
    "#,
        subject = notice.subject(),
        username = user.username,
        lead = notice.lead(booking),
        id = booking.id,
        check_in = booking.check_in.format("%a %b %d %Y"),
        check_out = booking.check_out.format("%a %b %d %Y"),
        guests = booking.guests,
        total = booking.total_price,
    );

    Notification {
        recipient: user.email.clone(),
        subject: notice.subject().to_string(),
        html_body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewBooking;
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    #[test]
    fn test_render_addresses_guest_and_lists_stay() {
        let hotel = Hotel::new("Seaside Inn", "1 Beach Rd", "Goa", "owner_1");
        let booking = NewBooking::new(
            "user_1",
            Uuid::new_v4(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 3).unwrap(),
            2,
            Utc::now(),
        )
        .into_booking(hotel.id, Decimal::new(200, 0));
        let user = User::new("user_1", "Asha", "asha@example.com");

        let message = render(BookingNotice::Created, &booking, &user, Some(&hotel));
        assert_eq!(message.recipient, "asha@example.com");
        assert_eq!(message.subject, "Booking Confirmation");
        assert!(message.html_body.contains("Dear Asha"));
        assert!(message.html_body.contains("Seaside Inn"));
        assert!(message.html_body.contains(&booking.id.to_string()));
        assert!(message.html_body.contains("200"));
    }
}
