//! Credit purchase endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::auth::AuthUser;
use super::json_body;
use crate::error::{ApiError, ApiResult};
use crate::services::CreditOrder;
use crate::AppState;

/// Largest single purchase
pub const MAX_CREDITS_PER_ORDER: u32 = 100_000;

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub credits: i64,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub url: String,
}

/// POST /api/checkout
///
/// Returns the hosted payment page URL. Credits are granted out of band
/// once payment clears.
pub async fn create_checkout(
    State(state): State<AppState>,
    auth: AuthUser,
    body: Result<Json<CheckoutRequest>, JsonRejection>,
) -> ApiResult<Json<CheckoutResponse>> {
    let request = json_body(body)?;
    let credits = u32::try_from(request.credits)
        .ok()
        .filter(|c| (1..=MAX_CREDITS_PER_ORDER).contains(c))
        .ok_or_else(|| {
            ApiError::BadRequest(format!(
                "Credits must be between 1 and {}",
                MAX_CREDITS_PER_ORDER
            ))
        })?;

    let order = CreditOrder::new(auth.id(), credits, &state.public_base_url);
    let session = state.checkout.create_session(&order).await?;

    info!(user_id = %auth.id(), credits, session_id = %session.id, "Checkout started");

    Ok(Json(CheckoutResponse { url: session.url }))
}

/// Build checkout routes
pub fn checkout_routes() -> Router<AppState> {
    Router::new().route("/api/checkout", post(create_checkout))
}
