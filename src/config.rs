use std::env;
use std::time::Duration;

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    pub test_before_acquire: bool,
}

/// Booking ledger settings
#[derive(Debug, Clone)]
pub struct BookingConfig {
    /// Upper bound for the create-booking transaction
    pub tx_timeout_secs: u64,
    /// ISO currency code used for payment sessions
    pub currency: String,
}

/// Lifecycle sweeper settings
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    pub stale_after_hours: i64,
}

/// Payment provider settings
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub stripe_api_base: String,
    pub frontend_url: String,
    pub webhook_tolerance_secs: i64,
}

/// SMTP settings; absent means notifications are only logged
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub sender_email: String,
    pub sender_name: String,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub booking: BookingConfig,
    pub sweeper: SweeperConfig,
    pub payment: PaymentConfig,
    pub smtp: Option<SmtpConfig>,
    pub log_level: String,
    pub http_port: u16,
    pub environment: String,
    pub audit_log_dir: String,
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.parse::<T>().ok())
}

impl DatabaseConfig {
    /// Create database config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL environment variable is required")?;

        let max_connections = parse_var("DATABASE_MAX_CONNECTIONS").unwrap_or(10);
        let acquire_timeout_secs = parse_var("DATABASE_ACQUIRE_TIMEOUT_SECS").unwrap_or(30);
        let idle_timeout_secs = parse_var("DATABASE_IDLE_TIMEOUT_SECS").unwrap_or(600); // 10 minutes
        let max_lifetime_secs = parse_var("DATABASE_MAX_LIFETIME_SECS").unwrap_or(1800); // 30 minutes
        let test_before_acquire = parse_var("DATABASE_TEST_BEFORE_ACQUIRE").unwrap_or(true);

        if max_connections == 0 {
            return Err("DATABASE_MAX_CONNECTIONS must be greater than 0".to_string());
        }

        if acquire_timeout_secs == 0 {
            return Err("DATABASE_ACQUIRE_TIMEOUT_SECS must be greater than 0".to_string());
        }

        Ok(Self {
            url,
            max_connections,
            acquire_timeout_secs,
            idle_timeout_secs,
            max_lifetime_secs,
            test_before_acquire,
        })
    }

    /// Get acquire timeout as Duration
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// Get idle timeout as Duration
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Get max lifetime as Duration
    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/staybook".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
            test_before_acquire: true,
        }
    }
}

impl BookingConfig {
    pub fn from_env() -> Result<Self, String> {
        let tx_timeout_secs = parse_var("BOOKING_TX_TIMEOUT_SECS").unwrap_or(10);
        if tx_timeout_secs == 0 {
            return Err("BOOKING_TX_TIMEOUT_SECS must be greater than 0".to_string());
        }

        let currency = env::var("CURRENCY")
            .unwrap_or_else(|_| "usd".to_string())
            .to_lowercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(format!("Invalid CURRENCY: {}. Expected a 3-letter ISO code", currency));
        }

        Ok(Self {
            tx_timeout_secs,
            currency,
        })
    }

    pub fn tx_timeout(&self) -> Duration {
        Duration::from_secs(self.tx_timeout_secs)
    }
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            tx_timeout_secs: 10,
            currency: "usd".to_string(),
        }
    }
}

impl SweeperConfig {
    pub fn from_env() -> Result<Self, String> {
        let enabled = parse_var("SWEEPER_ENABLED").unwrap_or(true);
        let interval_secs = parse_var("SWEEP_INTERVAL_SECS").unwrap_or(3600);
        let stale_after_hours = parse_var("STALE_BOOKING_HOURS").unwrap_or(24);

        if interval_secs == 0 {
            return Err("SWEEP_INTERVAL_SECS must be greater than 0".to_string());
        }

        if stale_after_hours <= 0 {
            return Err("STALE_BOOKING_HOURS must be greater than 0".to_string());
        }

        Ok(Self {
            enabled,
            interval_secs,
            stale_after_hours,
        })
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Age after which an unpaid pending booking is auto-cancelled
    pub fn staleness_threshold(&self) -> chrono::Duration {
        chrono::Duration::hours(self.stale_after_hours)
    }
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 3600,
            stale_after_hours: 24,
        }
    }
}

impl PaymentConfig {
    pub fn from_env() -> Result<Self, String> {
        let stripe_secret_key = env::var("STRIPE_SECRET_KEY")
            .map_err(|_| "STRIPE_SECRET_KEY environment variable is required")?;
        let stripe_webhook_secret = env::var("STRIPE_WEBHOOK_SECRET")
            .map_err(|_| "STRIPE_WEBHOOK_SECRET environment variable is required")?;
        let stripe_api_base = env::var("STRIPE_API_BASE")
            .unwrap_or_else(|_| "https://api.stripe.com".to_string());
        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:5173".to_string());
        let webhook_tolerance_secs = parse_var("WEBHOOK_TOLERANCE_SECS").unwrap_or(300);

        if webhook_tolerance_secs <= 0 {
            return Err("WEBHOOK_TOLERANCE_SECS must be greater than 0".to_string());
        }

        Ok(Self {
            stripe_secret_key,
            stripe_webhook_secret,
            stripe_api_base: stripe_api_base.trim_end_matches('/').to_string(),
            frontend_url: frontend_url.trim_end_matches('/').to_string(),
            webhook_tolerance_secs,
        })
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            stripe_secret_key: String::new(),
            stripe_webhook_secret: String::new(),
            stripe_api_base: "https://api.stripe.com".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            webhook_tolerance_secs: 300,
        }
    }
}

impl SmtpConfig {
    /// Returns `Ok(None)` when `SMTP_HOST` is not set.
    pub fn from_env() -> Result<Option<Self>, String> {
        let host = match env::var("SMTP_HOST") {
            Ok(h) if !h.is_empty() => h,
            _ => return Ok(None),
        };

        let port = parse_var("SMTP_PORT").unwrap_or(587);
        let username = env::var("SMTP_USER").map_err(|_| "SMTP_USER is required with SMTP_HOST")?;
        let password =
            env::var("SMTP_PASSWORD").map_err(|_| "SMTP_PASSWORD is required with SMTP_HOST")?;
        let sender_email =
            env::var("SENDER_EMAIL").map_err(|_| "SENDER_EMAIL is required with SMTP_HOST")?;
        let sender_name = env::var("SENDER_NAME").unwrap_or_else(|_| "StayBook".to_string());

        Ok(Some(Self {
            host,
            port,
            username,
            password,
            sender_email,
            sender_name,
        }))
    }
}

impl AppConfig {
    /// Create application config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let database = DatabaseConfig::from_env()?;
        let booking = BookingConfig::from_env()?;
        let sweeper = SweeperConfig::from_env()?;
        let payment = PaymentConfig::from_env()?;
        let smtp = SmtpConfig::from_env()?;

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let http_port = parse_var("HTTP_PORT").unwrap_or(3000);

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let audit_log_dir = env::var("AUDIT_LOG_DIR").unwrap_or_else(|_| "./logs".to_string());

        // Validate log level
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&log_level.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid LOG_LEVEL: {}. Must be one of: {:?}",
                log_level, valid_log_levels
            ));
        }

        // Validate environment
        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&environment.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid ENVIRONMENT: {}. Must be one of: {:?}",
                environment, valid_environments
            ));
        }

        Ok(Self {
            database,
            booking,
            sweeper,
            payment,
            smtp,
            log_level: log_level.to_lowercase(),
            http_port,
            environment: environment.to_lowercase(),
            audit_log_dir,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Check if running in development
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            booking: BookingConfig::default(),
            sweeper: SweeperConfig::default(),
            payment: PaymentConfig::default(),
            smtp: None,
            log_level: "info".to_string(),
            http_port: 3000,
            environment: "development".to_string(),
            audit_log_dir: "./logs".to_string(),
        }
    }
}
