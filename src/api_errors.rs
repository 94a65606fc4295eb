use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::errors::ServeError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.status();
        let msg = match self {
            AppError::BadRequest(s) | AppError::Internal(s) => s,
        };
        (code, Json(ErrBody { error: msg })).into_response()
    }
}

impl From<ServeError> for AppError {
    fn from(err: ServeError) -> Self {
        match err {
            ServeError::BadRequest { .. } | ServeError::MissingFeatures { .. } => {
                AppError::BadRequest(err.to_string())
            }
            // Display already carries the "Prediction failed: " prefix
            ServeError::Inference { .. } => AppError::Internal(err.to_string()),
            other => AppError::Internal(format!("Prediction failed: {other}")),
        }
    }
}
