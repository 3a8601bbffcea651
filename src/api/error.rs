use crate::error::{BookingError, ErrorCategory};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

/// Failure of an HTTP handler, rendered as `{ success: false, message }`
#[derive(Debug)]
pub enum ApiError {
    /// Body or path segment that could not be parsed
    BadRequest(String),
    Unauthorized,
    Forbidden(&'static str),
    Booking(BookingError),
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        ApiError::Booking(err)
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "success": false, "message": message }))).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => error_response(StatusCode::BAD_REQUEST, &message),
            ApiError::Unauthorized => error_response(StatusCode::UNAUTHORIZED, "Not authenticated"),
            ApiError::Forbidden(message) => error_response(StatusCode::FORBIDDEN, message),
            ApiError::Booking(err) => {
                let status = StatusCode::from_u16(err.status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

                match (&err, err.category()) {
                    (BookingError::RoomUnavailable(_), _) => error_response(
                        status,
                        "Room is no longer available for these dates. Please choose different dates.",
                    ),
                    (_, ErrorCategory::Internal) => {
                        error!("Request failed: {}", err);
                        error_response(status, "Something went wrong. Please try again.")
                    }
                    (_, ErrorCategory::External) => {
                        error!("Payment provider failure: {}", err);
                        error_response(status, "Payment could not be started. Please try again.")
                    }
                    _ => error_response(status, &err.to_string()),
                }
            }
        }
    }
}
