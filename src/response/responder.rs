//! Per-request responder handed to route handlers.
//!
//! The responder middleware inserts a [`Responder`] into the request
//! extensions before routing. Handlers take it as an extractor and reply
//! through one method per [`ResponseStatus`].

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use super::body::{build, Envelope, ResponseInput};
use super::status::ResponseStatus;

/// Reply helper bound to a single request.
#[derive(Debug, Clone)]
pub struct Responder {
    path: String,
}

impl Responder {
    /// Create a responder for the request at `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the request this responder answers.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Reply with an arbitrary status kind.
    pub fn respond(&self, status: ResponseStatus, input: ResponseInput) -> ApiResponse {
        ApiResponse::new(status, Some(input))
    }

    pub fn success(&self, input: ResponseInput) -> ApiResponse {
        self.respond(ResponseStatus::Success, input)
    }

    pub fn failure(&self, input: ResponseInput) -> ApiResponse {
        self.respond(ResponseStatus::Failure, input)
    }

    pub fn internal_server_error(&self, input: ResponseInput) -> ApiResponse {
        self.respond(ResponseStatus::ServerError, input)
    }

    pub fn bad_request(&self, input: ResponseInput) -> ApiResponse {
        self.respond(ResponseStatus::BadRequest, input)
    }

    pub fn record_not_found(&self, input: ResponseInput) -> ApiResponse {
        self.respond(ResponseStatus::RecordNotFound, input)
    }

    pub fn validation_error(&self, input: ResponseInput) -> ApiResponse {
        self.respond(ResponseStatus::ValidationError, input)
    }

    pub fn unauthorized(&self, input: ResponseInput) -> ApiResponse {
        self.respond(ResponseStatus::Unauthorized, input)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Responder
where
    S: Send + Sync,
{
    type Rejection = ApiResponse;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Responder>().cloned().ok_or_else(|| {
            error!(path = %parts.uri.path(), "responder middleware not installed");
            ApiResponse::new(ResponseStatus::ServerError, None)
        })
    }
}

/// Envelope paired with the HTTP status it is sent with.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    envelope: Envelope,
}

impl ApiResponse {
    /// Build the envelope for `status`.
    pub fn new(status: ResponseStatus, input: Option<ResponseInput>) -> Self {
        Self {
            envelope: build(status, input),
        }
    }

    /// Envelope that will be serialized.
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Outcome category.
    pub fn status(&self) -> ResponseStatus {
        self.envelope.status
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        let status = self.envelope.status;
        let mut response = (status.http_status(), Json(self.envelope)).into_response();
        // Read back by the metrics layer.
        response.extensions_mut().insert(status);
        response
    }
}
