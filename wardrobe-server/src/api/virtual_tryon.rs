//! Streaming virtual try-on endpoint
//!
//! Validation and authentication errors are ordinary JSON responses. Once
//! the request is accepted the response is `200` with an NDJSON body fed by
//! a pipeline running on its own task; the body ends when the pipeline
//! returns.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use tracing::{info, Instrument};

use super::auth::AuthUser;
use super::json_body;
use crate::error::{ApiError, ApiResult};
use crate::models::{PipelineOutcome, TryOnBody};
use crate::workflow::{ndjson_channel, TryOnPipeline, NDJSON_CONTENT_TYPE};
use crate::AppState;

/// Buffered lines between the pipeline and the response writer
const EVENT_BUFFER: usize = 16;

/// POST /api/virtual-tryon
pub async fn virtual_tryon(
    State(state): State<AppState>,
    auth: AuthUser,
    body: Result<Json<TryOnBody>, JsonRejection>,
) -> ApiResult<Response> {
    let request = json_body(body)?
        .into_request()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    if !state.tryon_model.is_configured() {
        return Err(ApiError::ServiceUnavailable(
            "Try-on model is not configured".to_string(),
        ));
    }

    let pipeline = TryOnPipeline::new(state.tryon_model.clone(), state.pipeline_settings);
    let (mut sink, body) = ndjson_channel(EVENT_BUFFER);

    let span = tracing::info_span!("virtual_tryon", user_id = %auth.id());
    tokio::spawn(
        async move {
            let outcome = pipeline.run(&request, &mut sink).await;
            if outcome == PipelineOutcome::Disconnected {
                info!("Client disconnected before try-on finished");
            }
        }
        .instrument(span),
    );

    Ok((
        [
            (header::CONTENT_TYPE, NDJSON_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response())
}

/// Build try-on routes
pub fn tryon_routes() -> Router<AppState> {
    Router::new().route("/api/virtual-tryon", post(virtual_tryon))
}
