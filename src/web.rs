use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    response::Json,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use uuid::Uuid;

use crate::api_errors::AppError;
use crate::app_state::AppState;
use crate::errors::ServeError;
use crate::input_validator::PredictionRequest;
use crate::predictor::{self, HealthResponse, PredictionResponse};

/// Router exposing `/health` and `/predict` over a shared, read-only state.
///
/// Request bodies are not size-capped: a batch is as large as the caller sends.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/predict", post(predict))
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[axum::debug_handler]
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(predictor::health(&state))
}

/// The body is read as raw bytes so malformed JSON gets the same guidance
/// as a well-formed body of the wrong shape.
#[axum::debug_handler]
async fn predict(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<PredictionResponse>, AppError> {
    let span = tracing::info_span!(
        "predict",
        request_id = %Uuid::new_v4(),
        rows = tracing::field::Empty
    );

    async move {
        let request = PredictionRequest::from_slice(&body).inspect_err(|e| {
            tracing::info!(error = %e, "rejected request body");
        })?;
        tracing::Span::current().record("rows", request.len());

        // Inference is synchronous; keep it off the async workers.
        let span = tracing::Span::current();
        let response = tokio::task::spawn_blocking(move || {
            span.in_scope(|| predictor::predict(&state, &request))
        })
        .await
        .map_err(|e| ServeError::inference(format!("inference task aborted: {e}")))?
        .inspect_err(|e| {
            if e.is_client_error() {
                tracing::info!(error = %e, "rejected request rows");
            }
        })?;

        Ok::<_, AppError>(Json(response))
    }
    .instrument(span)
    .await
}
