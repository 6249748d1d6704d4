use axum::{
    extract::{rejection::JsonRejection, State},
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use sqlx::PgPool;
use tower_sessions::Session;

use crate::api::middleware::{
    auth::{self, require_auth, AuthenticatedUser},
    session::AppState,
};
use crate::api::response::ApiResponse;
use crate::error::{AppError, Result};
use crate::models::user::{User, UserProfile};
use crate::services::accounts::{self, LoginInput, RegisterInput};

/// Registers a passenger and logs them in
async fn register(
    State(pool): State<PgPool>,
    session: Session,
    payload: std::result::Result<Json<RegisterInput>, JsonRejection>,
) -> Result<ApiResponse<UserProfile>> {
    let Json(input) = payload?;

    let user = accounts::register(&pool, input).await?;
    auth::log_in(&session, &user).await?;

    Ok(ApiResponse::created("User registered", UserProfile::from(&user)))
}

async fn login(
    State(pool): State<PgPool>,
    session: Session,
    payload: std::result::Result<Json<LoginInput>, JsonRejection>,
) -> Result<ApiResponse<UserProfile>> {
    let Json(input) = payload?;

    let user = accounts::authenticate(&pool, input).await?;
    auth::log_in(&session, &user).await?;

    Ok(ApiResponse::ok("User logged in", UserProfile::from(&user)))
}

async fn logout(session: Session) -> Result<ApiResponse<()>> {
    auth::log_out(&session).await?;
    Ok(ApiResponse::message("User logged out"))
}

/// Returns the profile of the logged-in user
async fn me(
    State(pool): State<PgPool>,
    Extension(current): Extension<AuthenticatedUser>,
) -> Result<ApiResponse<UserProfile>> {
    let user = User::find_by_id(&pool, current.user_id)
        .await?
        .ok_or_else(|| {
            AppError::Unauthorized("Authentication credentials were not provided.".to_string())
        })?;

    Ok(ApiResponse::ok("User retrieved", UserProfile::from(&user)))
}

pub fn router() -> Router<AppState> {
    let protected = Router::new()
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .route_layer(middleware::from_fn(require_auth));

    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .merge(protected)
}
