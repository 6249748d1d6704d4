use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tower_sessions::Session;
use uuid::Uuid;

use super::session::SESSION_KEY_USER;
use crate::error::AppError;
use crate::models::User;

/// Authentication error responses
#[derive(Debug)]
pub enum AuthError {
    Unauthorized,
    SessionError(String),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthorized => AppError::Unauthorized(
                "Authentication credentials were not provided.".to_string(),
            ),
            AuthError::SessionError(msg) => AppError::Session(msg),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}

/// Identity stored in the session and attached to authenticated requests.
///
/// Only the user id is kept; roles are read from the database on each check
/// so that a demotion takes effect without a new login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

impl From<&User> for AuthenticatedUser {
    fn from(user: &User) -> Self {
        Self { user_id: user.id }
    }
}

impl AuthenticatedUser {
    pub async fn is_admin(&self, pool: &PgPool) -> Result<bool, AppError> {
        User::admin_flag(pool, self.user_id)
            .await?
            .ok_or_else(|| AuthError::Unauthorized.into())
    }

    pub async fn ensure_admin(&self, pool: &PgPool) -> Result<(), AppError> {
        if self.is_admin(pool).await? {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Request forbidden, must be an admin".to_string(),
            ))
        }
    }
}

/// Middleware that requires the user to be authenticated.
/// The identity is made available to handlers as an `Extension<AuthenticatedUser>`.
pub async fn require_auth(
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = get_authenticated_user(&session).await?;
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Extracts the authenticated user from the session
pub async fn get_authenticated_user(session: &Session) -> Result<AuthenticatedUser, AuthError> {
    session
        .get::<AuthenticatedUser>(SESSION_KEY_USER)
        .await
        .map_err(|e| AuthError::SessionError(e.to_string()))?
        .ok_or(AuthError::Unauthorized)
}

/// Starts an authenticated session, issuing a fresh session id
pub async fn log_in(session: &Session, user: &User) -> Result<(), AuthError> {
    session
        .cycle_id()
        .await
        .map_err(|e| AuthError::SessionError(e.to_string()))?;

    session
        .insert(SESSION_KEY_USER, AuthenticatedUser::from(user))
        .await
        .map_err(|e| AuthError::SessionError(e.to_string()))?;

    tracing::info!(user_id = %user.id, "Session started");
    Ok(())
}

pub async fn log_out(session: &Session) -> Result<(), AuthError> {
    session
        .flush()
        .await
        .map_err(|e| AuthError::SessionError(e.to_string()))
}
