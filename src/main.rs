//! StayBook Backend Service
//!
//! Main entry point for the StayBook booking backend.
//! This service provides:
//! - HTTP API for booking, cancellation and checkout
//! - Stripe webhook endpoint for payment reconciliation
//! - Background sweeper for stale and drifted bookings

use anyhow::Context;
use staybook_backend::clock::SystemClock;
use staybook_backend::config::AppConfig;
use staybook_backend::database::{create_pool, run_migrations, Database};
use staybook_backend::notifications::{LogNotifier, Notifier, SmtpNotifier};
use staybook_backend::payments::StripeGateway;
use staybook_backend::services::AuditTrailService;
use staybook_backend::{create_router, AppError, AppState, Dependencies};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "staybook_backend={},sqlx=warn,tower_http=info",
            config.log_level
        )
        .into()
    });

    if config.is_production() {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables first
    dotenv::dotenv().ok();

    // Load configuration
    let config = AppConfig::from_env()
        .map_err(AppError::Config)
        .context("Failed to load configuration")?;

    init_tracing(&config);

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║           StayBook Backend Service Starting              ║");
    info!("╚══════════════════════════════════════════════════════════╝");
    info!("Environment: {}", config.environment);
    info!("Log level: {}", config.log_level);
    info!("HTTP port: {}", config.http_port);

    // =========================================================================
    // DATABASE SETUP
    // =========================================================================
    info!("Connecting to database...");

    let pool = create_pool(&config.database)
        .await
        .context("Failed to create database pool")?;

    Database::new(pool.clone())
        .ping()
        .await
        .context("Database is not reachable")?;

    info!("Database connection pool created successfully");
    info!("Max connections: {}", config.database.max_connections);

    info!("Running database migrations...");
    run_migrations(&pool)
        .await
        .context("Database migration failed")?;
    info!("Database migrations completed successfully");

    // =========================================================================
    // CORE SERVICES INITIALIZATION
    // =========================================================================
    info!("Initializing core services...");

    let notifier: Arc<dyn Notifier> = match &config.smtp {
        Some(smtp) => {
            let notifier = SmtpNotifier::new(smtp).context("Failed to configure SMTP")?;
            info!("✓ SMTP notifications via {}:{}", smtp.host, smtp.port);
            Arc::new(notifier)
        }
        None => {
            warn!("SMTP_HOST not configured - notifications will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let gateway = Arc::new(StripeGateway::new(
        config.payment.stripe_secret_key.clone(),
        config.payment.stripe_api_base.clone(),
    ));
    info!("✓ Stripe gateway initialized ({})", config.payment.stripe_api_base);

    let audit_trail = Arc::new(
        AuditTrailService::new(config.audit_log_dir.clone().into())
            .context("Audit trail initialization failed")?,
    );
    info!("✓ Audit trail service initialized");

    let deps = Dependencies::postgres(
        pool.clone(),
        &config,
        gateway,
        notifier,
        Arc::new(SystemClock),
    )
    .with_audit(audit_trail);

    let state = AppState::new(&config, deps);
    info!("✓ Booking, payment and sweeper services initialized");

    // =========================================================================
    // BACKGROUND TASKS
    // =========================================================================
    let sweeper_handle = if config.sweeper.enabled {
        let handle = state.sweeper.clone().spawn();
        info!(
            "✓ Sweeper background task started ({:?} interval, {}h staleness)",
            config.sweeper.interval(),
            config.sweeper.stale_after_hours
        );
        Some(handle)
    } else {
        warn!("SWEEPER_ENABLED=false - stale bookings will only be swept on demand");
        None
    };

    // =========================================================================
    // START SERVER
    // =========================================================================
    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind HTTP server on {}", addr))?;

    let app = create_router(state);

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║           StayBook Backend Service Ready!                ║");
    info!("╠══════════════════════════════════════════════════════════╣");
    info!("║  HTTP API:     {}                              ║", addr);
    info!("║  Environment:  {}                               ║", config.environment);
    info!("╚══════════════════════════════════════════════════════════╝");
    info!("Press Ctrl+C to shutdown gracefully");

    // =========================================================================
    // SHUTDOWN HANDLING
    // =========================================================================
    let server = axum::serve(listener, app).with_graceful_shutdown(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Shutdown signal received, shutting down gracefully...");
    });

    if let Err(e) = server.await {
        error!("HTTP server error: {}", e);
    }

    if let Some(handle) = sweeper_handle {
        handle.shutdown().await;
    }

    pool.close().await;
    info!("StayBook backend service shutdown complete");
    Ok(())
}
