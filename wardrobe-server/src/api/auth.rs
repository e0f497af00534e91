//! Session authentication for API handlers
//!
//! The token is read from `Authorization: Bearer <token>` or, failing that,
//! the `session_token` cookie.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, State},
    http::{header, request::Parts, HeaderValue},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{debug, info};
use wardrobe_common::auth::{resolve_session, revoke_session};
use wardrobe_common::db::UserRow;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Cookie carrying the session token for browser clients
pub const SESSION_COOKIE: &str = "session_token";

/// The signed-in user; extracting it rejects with 401 when absent
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: UserRow,
    /// Token the request authenticated with
    pub token: String,
}

impl AuthUser {
    pub fn id(&self) -> &str {
        &self.user.id
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = session_token(parts)
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

        let app_state = AppState::from_ref(state);
        let pool: &SqlitePool = &app_state.db;
        match resolve_session(pool, &token).await? {
            Some(user) => Ok(AuthUser { user, token }),
            None => {
                debug!("Rejected unknown or expired session token");
                Err(ApiError::Unauthorized("Invalid or expired session".to_string()))
            }
        }
    }
}

/// POST /api/auth/sign-out
///
/// Revokes the session the request was made with and clears the cookie.
pub async fn sign_out(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Response> {
    let revoked = revoke_session(&state.db, &auth.token).await?;
    info!(user_id = %auth.id(), revoked, "Signed out");

    let clear_cookie = HeaderValue::from_str(&format!(
        "{}=; Max-Age=0; Path=/; HttpOnly; SameSite=Lax",
        SESSION_COOKIE
    ))
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok((
        [(header::SET_COOKIE, clear_cookie)],
        Json(json!({ "success": true })),
    )
        .into_response())
}

/// Build session routes
pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/api/auth/sign-out", post(sign_out))
}

/// Session token from the bearer header or the session cookie
fn session_token(parts: &Parts) -> Option<String> {
    let bearer = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token.trim().to_string())
        .filter(|token| !token.is_empty())
}
