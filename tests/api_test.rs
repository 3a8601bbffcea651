mod helpers;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use helpers::*;
use serde_json::{json, Value};
use staybook_backend::models::BookingStatus;
use staybook_backend::payments::stripe::sign_payload;
use tower::ServiceExt;
use uuid::Uuid;

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn json_request(method: &str, uri: &str, user: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn webhook_request(app: &TestApp, payload: &Value) -> Request<Body> {
    let raw = payload.to_string();
    let header = sign_payload(raw.as_bytes(), WEBHOOK_SECRET, app.clock_now().timestamp());
    Request::builder()
        .method("POST")
        .uri("/api/stripe")
        .header("stripe-signature", header)
        .body(Body::from(raw))
        .unwrap()
}

fn checkout_completed(booking_ref: &str) -> Value {
    json!({
        "id": "evt_1",
        "type": "checkout.session.completed",
        "data": { "object": {
            "id": "cs_test_1",
            "payment_status": "paid",
            "metadata": { "bookingId": booking_ref }
        }}
    })
}

fn booking_body(app: &TestApp) -> Value {
    json!({
        "room": app.room.id,
        "checkInDate": "2024-03-01",
        "checkOutDate": "2024-03-03",
        "guests": 2
    })
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(app.router(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_book_requires_identity() {
    let app = TestApp::new().await;
    let (status, body) = send(
        app.router(),
        json_request("POST", "/api/bookings/book", None, booking_body(&app)),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_book_then_conflict() {
    let app = TestApp::new().await;

    let (status, body) = send(
        app.router(),
        json_request("POST", "/api/bookings/book", Some(app.guest.id.as_str()), booking_body(&app)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["booking"]["status"], "pending");
    assert_eq!(body["booking"]["isPaid"], false);
    assert_eq!(body["booking"]["totalPrice"], "200");

    let (status, body) = send(
        app.router(),
        json_request("POST", "/api/bookings/book", Some("user_late"), booking_body(&app)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("different dates"));

    let (status, body) = send(
        app.router(),
        json_request(
            "POST",
            "/api/bookings/check-availability",
            None,
            json!({ "room": app.room.id, "checkInDate": "2024-03-03", "checkOutDate": "2024-03-05" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isAvailable"], true);
}

#[tokio::test]
async fn test_invalid_dates_are_bad_request() {
    let app = TestApp::new().await;
    let (status, _) = send(
        app.router(),
        json_request(
            "POST",
            "/api/bookings/check-availability",
            None,
            json!({ "room": app.room.id, "checkInDate": "2024-03-05", "checkOutDate": "2024-03-05" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cancel_requires_ownership() {
    let app = TestApp::new().await;
    let booking = app
        .state
        .bookings
        .create_booking(&app.guest.id, app.room.id, date(2024, 3, 1), date(2024, 3, 3), 1)
        .await
        .unwrap();
    let uri = format!("/api/bookings/{}/cancel", booking.id);

    let (status, _) = send(
        app.router(),
        json_request("PUT", &uri, Some("user_stranger"), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        app.router(),
        json_request("PUT", &uri, Some(app.guest.id.as_str()), json!({ "reason": "flight cancelled" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["status"], "cancelled");
    assert_eq!(body["booking"]["cancellationReason"], "flight cancelled");

    let (status, _) = send(
        app.router(),
        json_request("PUT", &uri, Some(app.guest.id.as_str()), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_status_update_by_hotel_owner() {
    let app = TestApp::new().await;
    let booking = app
        .state
        .bookings
        .create_booking(&app.guest.id, app.room.id, date(2024, 3, 1), date(2024, 3, 3), 1)
        .await
        .unwrap();
    let uri = format!("/api/bookings/{}/status", booking.id);

    let (status, _) = send(
        app.router(),
        json_request("PUT", &uri, Some(app.guest.id.as_str()), json!({ "status": "confirmed" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        app.router(),
        json_request("PUT", &uri, Some(app.owner.id.as_str()), json!({ "status": "archived" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        app.router(),
        json_request("PUT", &uri, Some(app.owner.id.as_str()), json!({ "status": "confirmed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["status"], "confirmed");

    let missing = format!("/api/bookings/{}/status", Uuid::new_v4());
    let (status, _) = send(
        app.router(),
        json_request("PUT", &missing, Some(app.owner.id.as_str()), json!({ "status": "confirmed" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_hotel_dashboard_route() {
    let app = TestApp::new().await;
    app.state
        .bookings
        .create_booking(&app.guest.id, app.room.id, date(2024, 3, 1), date(2024, 3, 3), 1)
        .await
        .unwrap();

    let request = Request::builder()
        .uri("/api/bookings/hotel")
        .header("x-user-id", app.owner.id.as_str())
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app.router(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dashboardData"]["totalBookings"], 1);
    assert_eq!(body["dashboardData"]["totalRevenue"], "200");

    let request = Request::builder()
        .uri("/api/bookings/hotel")
        .header("x-user-id", app.guest.id.as_str())
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app.router(), request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stripe_payment_route_returns_url() {
    let app = TestApp::new().await;
    let booking = app
        .state
        .bookings
        .create_booking(&app.guest.id, app.room.id, date(2024, 3, 1), date(2024, 3, 3), 1)
        .await
        .unwrap();

    let (status, body) = send(
        app.router(),
        json_request(
            "POST",
            "/api/bookings/stripe-payment",
            Some(app.guest.id.as_str()),
            json!({ "bookingId": booking.id }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["url"], format!("https://checkout.test/pay/{}", booking.id));
}

#[tokio::test]
async fn test_webhook_confirms_booking_once() {
    let app = TestApp::new().await;
    let booking = app
        .state
        .bookings
        .create_booking(&app.guest.id, app.room.id, date(2024, 3, 1), date(2024, 3, 3), 1)
        .await
        .unwrap();
    let event = checkout_completed(&booking.id.to_string());

    let (status, _) = send(app.router(), webhook_request(&app, &event)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(app.router(), webhook_request(&app, &event)).await;
    assert_eq!(status, StatusCode::OK);

    let stored = app.state.bookings.get_booking(booking.id).await.unwrap();
    assert_eq!(stored.status, BookingStatus::Confirmed);
    assert!(stored.is_paid);
    assert_eq!(stored.payment_method.as_deref(), Some("Stripe"));

    let sent = app.notifier.wait_for(2).await;
    assert_eq!(sent.iter().filter(|n| n.subject == "Payment Received").count(), 1);
}

#[tokio::test]
async fn test_webhook_rejects_bad_signature() {
    let app = TestApp::new().await;
    let raw = checkout_completed(&Uuid::new_v4().to_string()).to_string();
    let header = sign_payload(raw.as_bytes(), "whsec_wrong", app.clock_now().timestamp());

    let request = Request::builder()
        .method("POST")
        .uri("/api/stripe")
        .header("stripe-signature", header)
        .body(Body::from(raw.clone()))
        .unwrap();
    let (status, _) = send(app.router(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let unsigned = Request::builder()
        .method("POST")
        .uri("/api/stripe")
        .body(Body::from(raw))
        .unwrap();
    let (status, _) = send(app.router(), unsigned).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_webhook_acknowledges_unknown_booking() {
    let app = TestApp::new().await;

    let (status, _) = send(app.router(), webhook_request(&app, &checkout_completed("bogus"))).await;
    assert_eq!(status, StatusCode::OK);

    let unknown = checkout_completed(&Uuid::new_v4().to_string());
    let (status, _) = send(app.router(), webhook_request(&app, &unknown)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_webhook_storage_failure_asks_for_retry() {
    let app = TestApp::new().await;
    app.store.set_offline(true);

    let event = checkout_completed(&Uuid::new_v4().to_string());
    let (status, _) = send(app.router(), webhook_request(&app, &event)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_manual_sweep_routes() {
    let app = TestApp::new().await;
    app.state
        .bookings
        .create_booking(&app.guest.id, app.room.id, date(2024, 3, 1), date(2024, 3, 3), 1)
        .await
        .unwrap();
    app.clock.advance(chrono::Duration::hours(30));

    let (status, body) = send(
        app.router(),
        json_request("POST", "/api/bookings/cleanup-unpaid", Some(app.owner.id.as_str()), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    let (status, body) = send(
        app.router(),
        json_request("POST", "/api/bookings/fix-all-paid", Some(app.owner.id.as_str()), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn test_malformed_body_uses_error_envelope() {
    let app = TestApp::new().await;
    let (status, body) = send(
        app.router(),
        json_request(
            "POST",
            "/api/bookings/book",
            Some(app.guest.id.as_str()),
            json!({ "room": "not-a-uuid", "checkInDate": "2024-13-01", "checkOutDate": "2024-03-03" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));

    let (status, body) = send(
        app.router(),
        json_request("PUT", "/api/bookings/not-a-uuid/cancel", Some(app.guest.id.as_str()), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(app.store.bookings().await.is_empty());
}

#[tokio::test]
async fn test_fix_status_confirms_paid_pending_only() {
    let app = TestApp::new().await;
    let booking = app
        .state
        .bookings
        .create_booking(&app.guest.id, app.room.id, date(2024, 3, 1), date(2024, 3, 3), 1)
        .await
        .unwrap();
    let uri = format!("/api/bookings/{}/fix-status", booking.id);

    let (status, body) = send(app.router(), json_request("PUT", &uri, Some("user_stranger"), json!({}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);

    // Unpaid: nothing to repair
    let (status, body) = send(app.router(), json_request("PUT", &uri, Some(app.guest.id.as_str()), json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fixed"], false);
    assert_eq!(body["booking"]["status"], "pending");

    let mut drifted = booking.clone();
    drifted.is_paid = true;
    app.store.insert_raw(drifted).await;

    let (status, body) = send(app.router(), json_request("PUT", &uri, Some(app.owner.id.as_str()), json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fixed"], true);
    assert_eq!(body["booking"]["status"], "confirmed");
    assert_eq!(body["booking"]["isPaid"], true);

    // Paid but cancelled stays cancelled
    let mut cancelled = app.state.bookings.get_booking(booking.id).await.unwrap();
    cancelled.status = BookingStatus::Cancelled;
    cancelled.cancelled_at = Some(app.clock_now());
    app.store.insert_raw(cancelled).await;

    let (status, body) = send(app.router(), json_request("PUT", &uri, Some(app.guest.id.as_str()), json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fixed"], false);
    assert_eq!(body["booking"]["status"], "cancelled");
}

#[tokio::test]
async fn test_manual_sweeps_require_hotel_owner() {
    let app = TestApp::new().await;

    for uri in ["/api/bookings/cleanup-unpaid", "/api/bookings/fix-all-paid"] {
        let (status, body) = send(app.router(), json_request("POST", uri, Some(app.guest.id.as_str()), json!({}))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["success"], false);

        let (status, _) = send(app.router(), json_request("POST", uri, Some("user_unknown"), json!({}))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
