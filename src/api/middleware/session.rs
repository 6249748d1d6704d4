use axum::extract::FromRef;
use sqlx::PgPool;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::services::mailer::Mailer;
use crate::services::notifier::Notifier;

/// Session keys used in the application
pub const SESSION_KEY_USER: &str = "user";

/// Creates the session store and the session layer for Axum
pub async fn create_session_layer(
    pool: PgPool,
    secure: bool,
) -> Result<(PostgresStore, SessionManagerLayer<PostgresStore>), sqlx::Error> {
    // Create the session store backed by PostgreSQL
    let session_store = PostgresStore::new(pool);
    session_store.migrate().await?;

    let session_layer = SessionManagerLayer::new(session_store.clone())
        .with_secure(secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::hours(24)));

    Ok((session_store, session_layer))
}

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: crate::config::Config,
    pub notifier: Notifier,
    pub mailer: Mailer,
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> PgPool {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Notifier {
    fn from_ref(state: &AppState) -> Notifier {
        state.notifier.clone()
    }
}
