//! HTTP API

pub mod auth;
pub mod bookings;
pub mod error;
pub mod extract;
pub mod health;
pub mod state;
pub mod webhook;

pub use auth::CurrentUser;
pub use error::ApiError;
pub use state::{AppState, WebhookSettings};

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    let bookings = Router::new()
        .route("/check-availability", post(bookings::check_availability))
        .route("/book", post(bookings::create_booking))
        .route("/user", get(bookings::user_bookings))
        .route("/hotel", get(bookings::hotel_bookings))
        .route("/stripe-payment", post(bookings::stripe_payment))
        .route("/cleanup-unpaid", post(bookings::cleanup_unpaid))
        .route("/fix-all-paid", post(bookings::fix_all_paid))
        .route("/:id/cancel", put(bookings::cancel_booking))
        .route("/:id/status", put(bookings::update_status))
        .route("/:id/fix-status", put(bookings::fix_status));

    // Stripe webhook (signature-verified, raw body)
    let webhook = Router::new().route("/api/stripe", post(webhook::handle_webhook));

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/bookings", bookings)
        .merge(webhook)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
