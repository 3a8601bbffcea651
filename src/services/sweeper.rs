use super::AuditTrailService;
use crate::clock::Clock;
use crate::error::BookingResult;
use crate::lifecycle::STALE_CANCELLATION_REASON;
use crate::models::Booking;
use crate::notifications::{BookingNotice, NotificationDispatcher};
use crate::repositories::BookingStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{error, info, warn};

/// Rows touched by one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub stale_cancelled: usize,
    pub paid_pending_repaired: usize,
    /// Paid but cancelled; reported only
    pub paid_cancelled_anomalies: usize,
}

/// Background task that expires unpaid bookings and repairs payment drift
pub struct Sweeper {
    bookings: Arc<dyn BookingStore>,
    notifier: NotificationDispatcher,
    clock: Arc<dyn Clock>,
    audit: Option<Arc<AuditTrailService>>,
    interval: Duration,
    staleness_threshold: chrono::Duration,
}

/// Running sweeper; dropping the handle also stops it
pub struct SweeperHandle {
    shutdown: oneshot::Sender<()>,
    pub join: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop after the current sweep, if any, and wait for the task
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.join.await {
            error!("Sweeper task ended abnormally: {}", e);
        }
    }
}

impl Sweeper {
    /// Create a new sweeper
    ///
    /// Defaults: sweep every hour, expire unpaid bookings after 24 hours.
    pub fn new(
        bookings: Arc<dyn BookingStore>,
        notifier: NotificationDispatcher,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            bookings,
            notifier,
            clock,
            audit: None,
            interval: Duration::from_secs(3600),
            staleness_threshold: chrono::Duration::hours(24),
        }
    }

    /// Set sweep interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the age after which unpaid bookings are cancelled
    pub fn with_staleness_threshold(mut self, threshold: chrono::Duration) -> Self {
        self.staleness_threshold = threshold;
        self
    }

    pub fn with_audit(mut self, audit: Arc<AuditTrailService>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn staleness_threshold(&self) -> chrono::Duration {
        self.staleness_threshold
    }

    /// Start sweeping on a timer. The first sweep runs one interval after start.
    pub fn spawn(self: Arc<Self>) -> SweeperHandle {
        let (shutdown, mut stop) = oneshot::channel();
        let interval = self.interval;

        let join = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + interval, interval);
            info!("Sweeper started, will sweep every {:?}", interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.run_once().await;
                    }
                    _ = &mut stop => {
                        info!("Sweeper stopped");
                        break;
                    }
                }
            }
        });

        SweeperHandle { shutdown, join }
    }

    /// One pass of every job. The jobs select disjoint rows and run
    /// concurrently; a failing job is logged and retried next tick.
    pub async fn run_once(&self) -> SweepReport {
        let mut report = SweepReport::default();

        let (stale, repaired, anomalies) = futures::join!(
            self.cancel_stale_unpaid(self.staleness_threshold),
            self.repair_paid_pending(),
            self.report_anomalies(),
        );

        match stale {
            Ok(count) => report.stale_cancelled = count,
            Err(e) => error!("Stale booking sweep failed: {}", e),
        }

        match repaired {
            Ok(count) => report.paid_pending_repaired = count,
            Err(e) => error!("Paid-pending repair failed: {}", e),
        }

        match anomalies {
            Ok(count) => report.paid_cancelled_anomalies = count,
            Err(e) => error!("Anomaly scan failed: {}", e),
        }

        info!(
            stale_cancelled = report.stale_cancelled,
            paid_pending_repaired = report.paid_pending_repaired,
            paid_cancelled_anomalies = report.paid_cancelled_anomalies,
            "Sweep finished"
        );
        report
    }

    /// Cancel pending, unpaid bookings older than `threshold`
    pub async fn cancel_stale_unpaid(&self, threshold: chrono::Duration) -> BookingResult<usize> {
        let now = self.clock.now();
        let cutoff = now - threshold;

        let cancelled = self
            .bookings
            .cancel_stale_unpaid(cutoff, STALE_CANCELLATION_REASON, now)
            .await?;

        for booking in &cancelled {
            info!(booking_id = %booking.id, created_at = %booking.created_at, "Cancelled stale unpaid booking");
            self.notifier.dispatch(booking, BookingNotice::AutoCancelled);
            self.audit_change(booking, "cancel_stale_unpaid").await;
        }

        Ok(cancelled.len())
    }

    /// Move paid bookings stuck in pending to confirmed
    pub async fn repair_paid_pending(&self) -> BookingResult<usize> {
        let repaired = self.bookings.confirm_paid_pending(self.clock.now()).await?;

        for booking in &repaired {
            info!(booking_id = %booking.id, "Repaired paid pending booking");
            self.audit_change(booking, "repair_paid_pending").await;
        }

        Ok(repaired.len())
    }

    /// Log paid bookings that are cancelled; never modifies them
    pub async fn report_anomalies(&self) -> BookingResult<usize> {
        let anomalies = self.bookings.find_paid_cancelled().await?;

        for booking in &anomalies {
            warn!(
                booking_id = %booking.id,
                total_price = %booking.total_price,
                "Paid booking is cancelled, needs manual review"
            );
        }

        Ok(anomalies.len())
    }

    async fn audit_change(&self, booking: &Booking, action: &str) {
        if let Some(audit) = &self.audit {
            if let Err(e) = audit.log_sweep_change(booking, action).await {
                warn!(booking_id = %booking.id, "Failed to write audit entry: {}", e);
            }
        }
    }
}
