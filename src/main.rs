use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flight_booking::api::middleware::session::{create_session_layer, AppState};
use flight_booking::config::Config;
use flight_booking::services::{accounts, mailer::Mailer, notifier::Notifier};
use flight_booking::{db, jobs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flight_booking=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting flight booking server...");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    // Create database pool
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Create session layer
    let (session_store, session_layer) =
        create_session_layer(pool.clone(), config.cookie_secure).await?;
    tracing::info!("Session layer initialized");

    if let Some(admin) = &config.admin {
        accounts::ensure_admin(&pool, admin).await?;
    }

    // Mail delivery runs on its own task
    let mailer = Mailer::from_config(&config)?;
    let (notifier, notifier_handle) = Notifier::spawn(mailer.clone());

    let mut scheduler = jobs::start_scheduler(pool.clone(), session_store).await?;

    // Build application state
    let state = AppState {
        pool: pool.clone(),
        config: config.clone(),
        notifier,
        mailer,
    };

    // Build router
    let app = Router::new()
        .merge(flight_booking::api::health::router())
        .merge(flight_booking::api::auth::router())
        .merge(flight_booking::api::flights::router())
        .merge(flight_booking::api::bookings::router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(session_layer),
        )
        .with_state(state);

    // Start server
    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router (and with it every notifier handle) is gone; let queued mail drain
    scheduler.shutdown().await?;
    notifier_handle.await?;
    pool.close().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install CTRL+C signal handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, cleaning up...");
}
