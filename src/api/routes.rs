//! HTTP API route definitions.

use axum::{routing::get, Router};

use super::handlers::{
    cpu_usage, memory_usage, method_not_allowed, not_found, server_health, uptime, AppState,
};
use crate::middleware;
use crate::realtime::socket_upgrade;

/// Path of the realtime WebSocket endpoint.
pub const SOCKET_PATH: &str = "/socket";

/// Create the API router with the full middleware stack.
pub fn create_router(state: AppState) -> Router {
    let routes = Router::new()
        // Diagnostic endpoints
        .route("/server-health", get(server_health).fallback(method_not_allowed))
        .route("/uptime", get(uptime).fallback(method_not_allowed))
        .route("/memory-usage", get(memory_usage).fallback(method_not_allowed))
        .route("/cpu-usage", get(cpu_usage).fallback(method_not_allowed))
        // Realtime transport
        .route(SOCKET_PATH, get(socket_upgrade).fallback(method_not_allowed))
        .fallback(not_found);

    middleware::apply(routes, &state.config).with_state(state)
}
