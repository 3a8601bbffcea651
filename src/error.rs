use crate::database::DatabaseError;
use crate::models::BookingStatus;
use sqlx::Error as SqlxError;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Application-level error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database errors
    #[error("SQL error: {0}")]
    Sqlx(#[from] SqlxError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Booking lifecycle errors
    #[error(transparent)]
    Booking(#[from] BookingError),

    /// I/O errors (listener bind, audit log files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Message(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Repository-specific error types
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Database query error
    #[error("Query error: {0}")]
    Query(SqlxError),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Duplicate record
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// Constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Exclusion constraint or serialization failure: another writer won the race
    #[error("Write conflict: {0}")]
    Conflict(String),
}

impl From<SqlxError> for RepositoryError {
    fn from(err: SqlxError) -> Self {
        match &err {
            SqlxError::RowNotFound => RepositoryError::NotFound("Record not found".to_string()),
            SqlxError::Database(db_err) => {
                // Check for common PostgreSQL error codes
                let code = db_err.code().map(|c| c.to_string());
                match code.as_deref() {
                    Some("23505") => RepositoryError::Duplicate(db_err.message().to_string()),
                    Some("23503") | Some("23514") => {
                        RepositoryError::ConstraintViolation(db_err.message().to_string())
                    }
                    // exclusion_violation, serialization_failure
                    Some("23P01") | Some("40001") => {
                        RepositoryError::Conflict(db_err.message().to_string())
                    }
                    _ => RepositoryError::Query(err),
                }
            }
            _ => RepositoryError::Query(err),
        }
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, RepositoryError>;

/// Coarse classification used by the API layer to choose status codes and
/// user-facing wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Conflict,
    NotFound,
    External,
    Internal,
}

/// Typed failures of the booking lifecycle operations
#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Room {0} is not available for the selected dates")]
    RoomUnavailable(Uuid),

    #[error("Booking {0} is already cancelled")]
    AlreadyCancelled(Uuid),

    #[error("Booking {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("Booking {0} was modified concurrently, try again")]
    Conflict(Uuid),

    #[error("Booking {0} not found")]
    BookingNotFound(Uuid),

    #[error("Room {0} not found")]
    RoomNotFound(Uuid),

    #[error("No hotel registered for owner {0}")]
    HotelNotFound(String),

    #[error("Payment confirmation references unknown booking {0}")]
    UnknownBooking(String),

    #[error("Booking {0} is cancelled and cannot be paid")]
    BookingCancelled(Uuid),

    #[error("Payment session error: {0}")]
    PaymentSession(String),

    #[error("Booking transaction timed out after {0:?}")]
    Timeout(Duration),

    #[error("Storage error: {0}")]
    Storage(#[from] RepositoryError),
}

pub type BookingResult<T> = Result<T, BookingError>;

impl BookingError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            BookingError::InvalidInput(_) | BookingError::InvalidStatus(_) => {
                ErrorCategory::Validation
            }
            BookingError::RoomUnavailable(_)
            | BookingError::AlreadyCancelled(_)
            | BookingError::InvalidTransition { .. }
            | BookingError::Conflict(_)
            | BookingError::BookingCancelled(_) => ErrorCategory::Conflict,
            BookingError::BookingNotFound(_)
            | BookingError::RoomNotFound(_)
            | BookingError::HotelNotFound(_)
            | BookingError::UnknownBooking(_) => ErrorCategory::NotFound,
            BookingError::PaymentSession(_) => ErrorCategory::External,
            BookingError::Timeout(_) | BookingError::Storage(_) => ErrorCategory::Internal,
        }
    }

    /// Get HTTP status code for the error
    pub fn status_code(&self) -> u16 {
        match self.category() {
            ErrorCategory::Validation => 400,
            ErrorCategory::Conflict => 409,
            ErrorCategory::NotFound => 404,
            ErrorCategory::External => 502,
            ErrorCategory::Internal => 500,
        }
    }

    /// Whether a caller may sensibly retry the identical request later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BookingError::Conflict(_) | BookingError::Timeout(_) | BookingError::Storage(_)
        )
    }
}
