//! Attaches a [`Responder`] to every request before routing, and records
//! the outcome of every response.

use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use crate::metrics;
use crate::response::{Responder, ResponseStatus};

/// Insert the request's [`Responder`] into its extensions.
pub async fn attach_responder(mut request: Request, next: Next) -> Response {
    let responder = Responder::new(request.uri().path());
    request.extensions_mut().insert(responder);
    next.run(request).await
}

/// Record latency and envelope status per endpoint.
pub async fn record_outcome(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;

    let outcome: &'static str = response
        .extensions()
        .get::<ResponseStatus>()
        .map(|status| (*status).into())
        .unwrap_or("RAW");

    debug!(endpoint = %endpoint, outcome, status = %response.status(), "request completed");
    metrics::record_http_request(start, &endpoint, outcome);

    response
}
