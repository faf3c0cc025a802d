//! Request middleware.
//!
//! [`apply`] installs the stack in a fixed order. Listed outermost first,
//! which is the order a request passes through them:
//!
//! 1. request tracing and outcome metrics
//! 2. trust proxy
//! 3. cookie session
//! 4. HTTP parameter pollution guard
//! 5. security headers
//! 6. CORS
//! 7. responder attachment
//! 8. response compression
//! 9. body size limits for JSON and URL-encoded bodies
//!
//! The session must see [`proxy::ClientInfo`] to decide whether a secure
//! cookie may be sent, and the responder must be attached before any
//! handler runs.

pub mod hpp;
pub mod proxy;
pub mod responder;
pub mod security;
pub mod session;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::Config;

pub use hpp::PollutedQuery;
pub use proxy::{ClientInfo, TrustProxy};
pub use session::{Session, SessionConfig};

/// Wrap `routes` in the full middleware stack.
pub fn apply<S>(routes: Router<S>, config: &Config) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let trust = TrustProxy {
        hops: config.trust_proxy_hops,
    };

    routes.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(from_fn(responder::record_outcome))
            .layer(from_fn_with_state(trust, proxy::trust_proxy))
            .layer(from_fn_with_state(
                SessionConfig::from_config(config),
                session::cookie_session,
            ))
            .layer(from_fn(hpp::hpp_guard))
            .layer(from_fn(security::security_headers))
            .layer(cors_layer(config))
            .layer(from_fn(responder::attach_responder))
            .layer(CompressionLayer::new())
            .layer(DefaultBodyLimit::max(config.body_limit_bytes))
            .layer(RequestBodyLimitLayer::new(config.body_limit_bytes)),
    )
}

/// CORS policy: configured origin (or any origin, mirrored so credentials
/// remain allowed), credentials on.
pub fn cors_layer(config: &Config) -> CorsLayer {
    let origin = match config.allowed_origin() {
        Some(origin) => match HeaderValue::from_str(origin) {
            Ok(value) => AllowOrigin::exact(value),
            Err(e) => {
                warn!(origin, error = %e, "CLIENT_URL is not a valid header value; allowing any origin");
                AllowOrigin::mirror_request()
            }
        },
        None => AllowOrigin::mirror_request(),
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}
