#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use staybook_backend::clock::ManualClock;
use staybook_backend::config::AppConfig;
use staybook_backend::models::{Hotel, Room, User};
use staybook_backend::notifications::{Notification, Notifier, NotifyError};
use staybook_backend::payments::{PaymentError, PaymentGateway, PaymentSession, SessionRequest};
use staybook_backend::repositories::InMemoryStore;
use staybook_backend::{create_router, AppState, Dependencies};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 2, 20, 12, 0, 0).unwrap()
}

/// Notifier that keeps every message it is asked to send
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn subjects(&self) -> Vec<String> {
        self.sent().into_iter().map(|n| n.subject).collect()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Wait until at least `count` messages were sent, then let stragglers land
    pub async fn wait_for(&self, count: usize) -> Vec<Notification> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while self.sent.lock().unwrap().len() < count && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.sent()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Transport("smtp down".to_string()));
        }
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// Payment gateway that records requests and returns a fixed URL
#[derive(Default)]
pub struct FakeGateway {
    requests: Mutex<Vec<SessionRequest>>,
    fail: AtomicBool,
}

impl FakeGateway {
    pub fn requests(&self) -> Vec<SessionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_session(&self, request: &SessionRequest) -> Result<PaymentSession, PaymentError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PaymentError::Request("connection refused".to_string()));
        }
        self.requests.lock().unwrap().push(request.clone());
        Ok(PaymentSession {
            id: Some(format!("cs_test_{}", request.booking_id.simple())),
            url: format!("https://checkout.test/pay/{}", request.booking_id),
        })
    }
}

/// In-memory service with one hotel, one $100/night room, a guest and an owner
pub struct TestApp {
    pub store: Arc<InMemoryStore>,
    pub clock: ManualClock,
    pub notifier: Arc<RecordingNotifier>,
    pub gateway: Arc<FakeGateway>,
    pub config: AppConfig,
    pub state: AppState,
    pub hotel: Hotel,
    pub room: Room,
    pub guest: User,
    pub owner: User,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut config = AppConfig::default();
        config.payment.stripe_webhook_secret = WEBHOOK_SECRET.to_string();
        config.payment.frontend_url = "https://stay.test".to_string();
        config.booking.tx_timeout_secs = 1;
        Self::with_config(config).await
    }

    pub async fn with_config(config: AppConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let clock = ManualClock::new(start_time());
        let notifier = Arc::new(RecordingNotifier::default());
        let gateway = Arc::new(FakeGateway::default());

        let guest = User::new("user_guest", "Asha", "asha@example.com");
        let mut owner = User::new("user_owner", "Ravi", "ravi@example.com");
        owner.role = "hotelOwner".to_string();
        let hotel = Hotel::new("Seaside Inn", "1 Beach Rd", "Goa", owner.id.clone());
        let room = Room::new(hotel.id, "Deluxe", Decimal::new(100, 0));

        store.add_user(guest.clone()).await;
        store.add_user(owner.clone()).await;
        store.add_hotel(hotel.clone()).await;
        store.add_room(room.clone()).await;

        let deps = Dependencies::in_memory(
            store.clone(),
            gateway.clone(),
            notifier.clone(),
            Arc::new(clock.clone()),
        );
        let state = AppState::new(&config, deps);

        Self {
            store,
            clock,
            notifier,
            gateway,
            config,
            state,
            hotel,
            room,
            guest,
            owner,
        }
    }

    pub fn router(&self) -> axum::Router {
        create_router(self.state.clone())
    }

    /// Add another room to the test hotel
    pub async fn add_room(&self, nightly: i64) -> Room {
        let room = Room::new(self.hotel.id, "Standard", Decimal::new(nightly, 0));
        self.store.add_room(room.clone()).await;
        room
    }
}

impl TestApp {
    pub fn clock_now(&self) -> DateTime<Utc> {
        use staybook_backend::clock::Clock;
        self.clock.now()
    }
}
