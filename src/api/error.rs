//! Handler errors rendered as server-error envelopes.

use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use crate::error::ProbeError;
use crate::response::{ApiResponse, ResponseStatus};

/// Failure inside a request handler.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Reading host state failed.
    #[error("probe failed: {0}")]
    Probe(#[from] ProbeError),

    /// The blocking read was cancelled or panicked.
    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Payload could not be encoded.
    #[error("serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %self, "request handler failed");
        ApiResponse::new(ResponseStatus::ServerError, None).into_response()
    }
}
