use crate::error::{AppError, AppResult};
use crate::lifecycle::ConfirmationOutcome;
use crate::models::{Booking, BookingStatus};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

/// Audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub timestamp: i64,
    pub event_type: String, // "booking_created", "payment_confirmed", "payment_anomaly", etc.
    pub booking_id: Option<Uuid>,
    pub user_id: Option<String>,
    pub details: serde_json::Value,
}

struct DailyFile {
    date: NaiveDate,
    file: File,
}

/// Append-only JSON-lines record of lifecycle changes and anomalies,
/// one file per UTC day
pub struct AuditTrailService {
    log_directory: PathBuf,
    current: Mutex<DailyFile>,
}

fn open_for(log_directory: &Path, date: NaiveDate) -> AppResult<File> {
    let log_file = log_directory.join(format!("audit_{}.log", date.format("%Y-%m-%d")));

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)
        .map_err(|e| AppError::Message(format!("Failed to open audit log file: {}", e)))
}

impl AuditTrailService {
    /// Create a new audit trail service
    pub fn new(log_directory: PathBuf) -> AppResult<Self> {
        // Ensure directory exists
        std::fs::create_dir_all(&log_directory)
            .map_err(|e| AppError::Message(format!("Failed to create log directory: {}", e)))?;

        let date = Utc::now().date_naive();
        let file = open_for(&log_directory, date)?;

        info!("Audit trail initialized: {:?}", log_directory);

        Ok(Self {
            log_directory,
            current: Mutex::new(DailyFile { date, file }),
        })
    }

    pub fn log_directory(&self) -> &Path {
        &self.log_directory
    }

    /// Log an audit entry
    pub async fn log(&self, entry: AuditLogEntry) -> AppResult<()> {
        let json = serde_json::to_string(&entry)?;

        let mut current = self.current.lock().await;
        let today = Utc::now().date_naive();
        if current.date != today {
            current.file = open_for(&self.log_directory, today)?;
            current.date = today;
        }

        writeln!(current.file, "{}", json)
            .map_err(|e| AppError::Message(format!("Failed to write audit log: {}", e)))?;

        current
            .file
            .flush()
            .map_err(|e| AppError::Message(format!("Failed to flush audit log: {}", e)))?;

        Ok(())
    }

    fn entry(event_type: &str, booking: &Booking, details: serde_json::Value) -> AuditLogEntry {
        AuditLogEntry {
            timestamp: Utc::now().timestamp(),
            event_type: event_type.to_string(),
            booking_id: Some(booking.id),
            user_id: Some(booking.user_id.clone()),
            details,
        }
    }

    /// Log booking creation
    pub async fn log_booking_created(&self, booking: &Booking) -> AppResult<()> {
        self.log(Self::entry(
            "booking_created",
            booking,
            serde_json::json!({
                "room_id": booking.room_id.to_string(),
                "hotel_id": booking.hotel_id.to_string(),
                "check_in": booking.check_in.to_string(),
                "check_out": booking.check_out.to_string(),
                "guests": booking.guests,
                "total_price": booking.total_price.to_string(),
            }),
        ))
        .await
    }

    /// Log a status change, user or administrative
    pub async fn log_status_changed(
        &self,
        booking: &Booking,
        from: BookingStatus,
        actor: &str,
    ) -> AppResult<()> {
        self.log(Self::entry(
            "status_changed",
            booking,
            serde_json::json!({
                "from": from.as_str(),
                "to": booking.status.as_str(),
                "actor": actor,
                "reason": booking.cancellation_reason,
            }),
        ))
        .await
    }

    /// Log a processed payment confirmation
    pub async fn log_payment(&self, booking: &Booking, outcome: ConfirmationOutcome) -> AppResult<()> {
        let event_type = match outcome {
            ConfirmationOutcome::PaidAfterCancellation => "payment_anomaly",
            _ => "payment_confirmed",
        };

        self.log(Self::entry(
            event_type,
            booking,
            serde_json::json!({
                "outcome": format!("{:?}", outcome),
                "status": booking.status.as_str(),
                "payment_method": booking.payment_method,
                "total_price": booking.total_price.to_string(),
            }),
        ))
        .await
    }

    /// Log a row changed by the lifecycle sweeper
    pub async fn log_sweep_change(&self, booking: &Booking, action: &str) -> AppResult<()> {
        self.log(Self::entry(
            "sweeper",
            booking,
            serde_json::json!({
                "action": action,
                "status": booking.status.as_str(),
                "is_paid": booking.is_paid,
            }),
        ))
        .await
    }
}
