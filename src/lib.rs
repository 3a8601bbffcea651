//! StayBook Backend Library
//!
//! Booking lifecycle and payment-consistency core of the StayBook hotel
//! booking service, exposed for the binary and for tests.

pub mod api;
pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod notifications;
pub mod payments;
pub mod repositories;
pub mod services;

// Re-export commonly used types
pub use api::{create_router, AppState};
pub use config::AppConfig;
pub use error::{AppError, AppResult, BookingError, BookingResult};

use api::WebhookSettings;
use clock::Clock;
use notifications::{NotificationDispatcher, Notifier};
use payments::PaymentGateway;
use repositories::*;
use services::{AuditTrailService, BookingService, CheckoutUrls, PaymentService, Sweeper};
use std::sync::Arc;

/// Collaborators the services are wired from
#[derive(Clone)]
pub struct Dependencies {
    pub bookings: Arc<dyn BookingStore>,
    pub rooms: Arc<dyn RoomCatalog>,
    pub hotels: Arc<dyn HotelDirectory>,
    pub users: Arc<dyn UserDirectory>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
    pub audit: Option<Arc<AuditTrailService>>,
}

impl Dependencies {
    /// Postgres-backed repositories
    pub fn postgres(
        pool: sqlx::PgPool,
        config: &AppConfig,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            bookings: Arc::new(
                BookingRepository::new(pool.clone()).with_statement_timeout(config.booking.tx_timeout()),
            ),
            rooms: Arc::new(RoomRepository::new(pool.clone())),
            hotels: Arc::new(HotelRepository::new(pool.clone())),
            users: Arc::new(UserRepository::new(pool)),
            gateway,
            notifier,
            clock,
            audit: None,
        }
    }

    /// A single in-memory store serving every repository role
    pub fn in_memory(
        store: Arc<InMemoryStore>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            bookings: store.clone(),
            rooms: store.clone(),
            hotels: store.clone(),
            users: store,
            gateway,
            notifier,
            clock,
            audit: None,
        }
    }

    pub fn with_audit(mut self, audit: Arc<AuditTrailService>) -> Self {
        self.audit = Some(audit);
        self
    }
}

impl AppState {
    /// Wire services from configuration and collaborators
    pub fn new(config: &AppConfig, deps: Dependencies) -> Self {
        let dispatcher = NotificationDispatcher::new(
            deps.notifier.clone(),
            deps.users.clone(),
            deps.hotels.clone(),
        );

        let mut bookings = BookingService::new(
            deps.bookings.clone(),
            deps.rooms.clone(),
            deps.hotels.clone(),
            dispatcher.clone(),
            deps.clock.clone(),
        )
        .with_tx_timeout(config.booking.tx_timeout());

        let mut payments = PaymentService::new(
            deps.bookings.clone(),
            deps.hotels.clone(),
            deps.gateway.clone(),
            dispatcher.clone(),
            deps.clock.clone(),
            CheckoutUrls::for_frontend(&config.payment.frontend_url),
        )
        .with_currency(config.booking.currency.clone());

        let mut sweeper = Sweeper::new(deps.bookings.clone(), dispatcher, deps.clock.clone())
            .with_interval(config.sweeper.interval())
            .with_staleness_threshold(config.sweeper.staleness_threshold());

        if let Some(audit) = &deps.audit {
            bookings = bookings.with_audit(audit.clone());
            payments = payments.with_audit(audit.clone());
            sweeper = sweeper.with_audit(audit.clone());
        }

        Self {
            bookings: Arc::new(bookings),
            payments: Arc::new(payments),
            sweeper: Arc::new(sweeper),
            hotels: deps.hotels,
            users: deps.users,
            webhook: WebhookSettings {
                secret: config.payment.stripe_webhook_secret.clone(),
                tolerance_secs: config.payment.webhook_tolerance_secs,
            },
            clock: deps.clock,
        }
    }
}
