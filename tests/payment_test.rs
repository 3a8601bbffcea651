mod helpers;

use helpers::*;
use rust_decimal::Decimal;
use staybook_backend::lifecycle::ConfirmationOutcome;
use staybook_backend::models::{Booking, BookingStatus};
use staybook_backend::services::STRIPE_PAYMENT_METHOD;
use staybook_backend::BookingError;
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

async fn pending_booking(app: &TestApp) -> Booking {
    app.state
        .bookings
        .create_booking(&app.guest.id, app.room.id, date(2024, 3, 1), date(2024, 3, 3), 2)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_payment_session_describes_booking() {
    let app = TestApp::new().await;
    let booking = pending_booking(&app).await;

    let session = assert_ok!(app.state.payments.create_payment_session(booking.id).await);
    assert_eq!(session.url, format!("https://checkout.test/pay/{}", booking.id));

    let requests = app.gateway.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.booking_id, booking.id);
    assert_eq!(request.amount_minor, 20000);
    assert_eq!(request.currency, "usd");
    assert_eq!(request.label, "Seaside Inn");
    assert_eq!(request.success_url, "https://stay.test/loader/my-bookings");
    assert_eq!(request.cancel_url, "https://stay.test/my-bookings");
}

#[tokio::test]
async fn test_payment_session_rejects_missing_and_cancelled() {
    let app = TestApp::new().await;

    let missing = app.state.payments.create_payment_session(Uuid::new_v4()).await;
    assert!(matches!(missing, Err(BookingError::BookingNotFound(_))));

    let booking = pending_booking(&app).await;
    assert_ok!(app.state.bookings.cancel_booking(booking.id, None).await);
    let cancelled = app.state.payments.create_payment_session(booking.id).await;
    assert!(matches!(cancelled, Err(BookingError::BookingCancelled(_))));
    assert!(app.gateway.requests().is_empty());
}

#[tokio::test]
async fn test_payment_session_provider_failure() {
    let app = TestApp::new().await;
    let booking = pending_booking(&app).await;
    app.gateway.set_failing(true);

    let err = assert_err!(app.state.payments.create_payment_session(booking.id).await);
    assert!(matches!(err, BookingError::PaymentSession(_)));
    assert_eq!(err.status_code(), 502);
}

#[tokio::test]
async fn test_confirmation_is_idempotent() {
    let app = TestApp::new().await;
    let booking = pending_booking(&app).await;
    let payments = &app.state.payments;

    let first = assert_ok!(payments.handle_payment_confirmed(booking.id, STRIPE_PAYMENT_METHOD).await);
    assert_eq!(first, ConfirmationOutcome::Confirmed);
    let after_first = app.state.bookings.get_booking(booking.id).await.unwrap();

    app.clock.advance(chrono::Duration::minutes(5));
    let second = assert_ok!(payments.handle_payment_confirmed(booking.id, STRIPE_PAYMENT_METHOD).await);
    assert_eq!(second, ConfirmationOutcome::AlreadyConfirmed);
    let after_second = app.state.bookings.get_booking(booking.id).await.unwrap();

    assert_eq!(after_first, after_second);
    assert_eq!(after_second.status, BookingStatus::Confirmed);
    assert!(after_second.is_paid);
    assert_eq!(after_second.payment_method.as_deref(), Some("Stripe"));

    let sent = app.notifier.wait_for(2).await;
    let receipts = sent.iter().filter(|n| n.subject == "Payment Received").count();
    assert_eq!(receipts, 1);
}

#[tokio::test]
async fn test_concurrent_confirmations_notify_once() {
    let app = TestApp::new().await;
    let booking = pending_booking(&app).await;

    let results = futures::future::join_all((0..5).map(|_| {
        app.state
            .payments
            .handle_payment_confirmed(booking.id, STRIPE_PAYMENT_METHOD)
    }))
    .await;

    let confirmed = results
        .into_iter()
        .map(|r| r.unwrap())
        .filter(|o| *o == ConfirmationOutcome::Confirmed)
        .count();
    assert_eq!(confirmed, 1);

    let sent = app.notifier.wait_for(2).await;
    assert_eq!(sent.iter().filter(|n| n.subject == "Payment Received").count(), 1);
}

#[tokio::test]
async fn test_payment_after_cancellation_stays_cancelled() {
    let app = TestApp::new().await;
    let booking = pending_booking(&app).await;
    assert_ok!(app.state.bookings.cancel_booking(booking.id, Some("changed my mind".into())).await);

    let outcome = assert_ok!(
        app.state
            .payments
            .handle_payment_confirmed(booking.id, STRIPE_PAYMENT_METHOD)
            .await
    );
    assert_eq!(outcome, ConfirmationOutcome::PaidAfterCancellation);

    let stored = app.state.bookings.get_booking(booking.id).await.unwrap();
    assert_eq!(stored.status, BookingStatus::Cancelled);
    assert!(stored.is_paid);
    assert_eq!(stored.cancellation_reason.as_deref(), Some("changed my mind"));

    let again = app.state.bookings.update_status(booking.id, "confirmed").await;
    assert!(matches!(again, Err(BookingError::AlreadyCancelled(_))));

    let sent = app.notifier.wait_for(2).await;
    assert!(!sent.iter().any(|n| n.subject == "Payment Received"));
}

#[tokio::test]
async fn test_confirmation_repairs_drifted_row() {
    let app = TestApp::new().await;
    let mut booking = pending_booking(&app).await;
    booking.is_paid = true;
    booking.payment_method = Some("Stripe".to_string());
    app.store.insert_raw(booking.clone()).await;

    let outcome = assert_ok!(
        app.state
            .payments
            .handle_payment_confirmed(booking.id, STRIPE_PAYMENT_METHOD)
            .await
    );
    assert_eq!(outcome, ConfirmationOutcome::Repaired);
    let stored = app.state.bookings.get_booking(booking.id).await.unwrap();
    assert_eq!(stored.status, BookingStatus::Confirmed);
}

#[tokio::test]
async fn test_unknown_booking_reference() {
    let app = TestApp::new().await;
    let payments = &app.state.payments;

    let missing = payments
        .handle_payment_confirmed(Uuid::new_v4(), STRIPE_PAYMENT_METHOD)
        .await;
    assert!(matches!(missing, Err(BookingError::UnknownBooking(_))));

    let malformed = payments.confirm_from_reference("not-a-uuid", STRIPE_PAYMENT_METHOD).await;
    assert!(matches!(malformed, Err(BookingError::UnknownBooking(ref r)) if r == "not-a-uuid"));
}

#[tokio::test]
async fn test_end_to_end_checkout_flow() {
    let app = TestApp::new().await;

    let booking = pending_booking(&app).await;
    assert_eq!(booking.total_price, Decimal::new(200, 0));
    assert_eq!(booking.status, BookingStatus::Pending);
    assert!(!booking.is_paid);

    let session = assert_ok!(app.state.payments.create_payment_session(booking.id).await);
    assert!(session.url.starts_with("https://checkout.test/"));

    let reference = booking.id.to_string();
    let first = assert_ok!(app.state.payments.confirm_from_reference(&reference, "Stripe").await);
    assert_eq!(first, ConfirmationOutcome::Confirmed);
    let confirmed = app.state.bookings.get_booking(booking.id).await.unwrap();
    assert_eq!(confirmed.status, BookingStatus::Confirmed);
    assert!(confirmed.is_paid);

    let second = assert_ok!(app.state.payments.confirm_from_reference(&reference, "Stripe").await);
    assert_eq!(second, ConfirmationOutcome::AlreadyConfirmed);
    assert_eq!(app.state.bookings.get_booking(booking.id).await.unwrap(), confirmed);
}
