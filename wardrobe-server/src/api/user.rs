//! Profile and credit balance endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::auth::AuthUser;
use super::json_body;
use crate::db::users;
use crate::error::{ApiError, ApiResult};
use crate::models::Profile;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct CreditsResponse {
    pub credits: i64,
}

#[derive(Debug, Deserialize)]
pub struct DeductCreditsRequest {
    pub amount: i64,
}

/// GET /api/user/profile
pub async fn get_profile(auth: AuthUser) -> Json<Profile> {
    Json(Profile::from(auth.user))
}

/// GET /api/user/credits
pub async fn get_credits(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<CreditsResponse>> {
    let user = users::get_user(&state.db, auth.id())
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(CreditsResponse {
        credits: user.credits,
    }))
}

/// POST /api/user/credits
///
/// Spend `amount` credits. The balance never goes negative.
pub async fn deduct_credits(
    State(state): State<AppState>,
    auth: AuthUser,
    body: Result<Json<DeductCreditsRequest>, JsonRejection>,
) -> ApiResult<Json<CreditsResponse>> {
    let request = json_body(body)?;
    if request.amount <= 0 {
        return Err(ApiError::BadRequest("Amount must be positive".to_string()));
    }

    let credits = users::deduct_credits(&state.db, auth.id(), request.amount)
        .await?
        .ok_or_else(|| ApiError::BadRequest("Insufficient credits".to_string()))?;

    info!(user_id = %auth.id(), amount = request.amount, remaining = credits, "Credits spent");

    Ok(Json(CreditsResponse { credits }))
}

/// Build user routes
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/api/user/profile", get(get_profile))
        .route("/api/user/credits", get(get_credits).post(deduct_credits))
}
