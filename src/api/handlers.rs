//! HTTP API handlers: diagnostic reads of process and host state.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Local;
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use super::error::ApiError;
use crate::config::Config;
use crate::realtime::ConnectionSet;
use crate::response::{ApiResponse, Responder, ResponseInput};
use crate::server::ShutdownSignal;
use crate::system::format::CpuUsage;
use crate::system::{
    cpu_usage_percentages, format_long_date, format_megabytes, humanize_duration, SystemProbe,
};

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Process-wide configuration, read-only after startup.
    pub config: Arc<Config>,
    /// Source of process and host readings.
    pub probe: Arc<dyn SystemProbe>,
    /// Live realtime connections.
    pub connections: ConnectionSet,
    /// Process-wide shutdown latch; realtime tasks are supervised by it.
    pub shutdown: ShutdownSignal,
}

impl AppState {
    /// Create new app state.
    pub fn new(config: Config, probe: Arc<dyn SystemProbe>) -> Self {
        Self {
            config: Arc::new(config),
            probe,
            connections: ConnectionSet::new(),
            shutdown: ShutdownSignal::new(),
        }
    }
}

/// One entry of the CPU usage report.
#[derive(Debug, Serialize)]
pub struct CpuReport {
    /// 1-based core index.
    pub cpu: usize,
    /// Brand string.
    pub model: String,
    /// Clock speed in MHz.
    pub speed: u64,
    /// Share of time per bucket.
    pub usage: CpuUsage,
}

/// Server health handler - reports the process id and today's date.
pub async fn server_health(State(state): State<AppState>, responder: Responder) -> ApiResponse {
    let message = format!(
        "Health: Server instance is healthy with process id {} on {}",
        state.probe.process_id(),
        format_long_date(&Local::now())
    );

    responder.success(ResponseInput::message(message))
}

/// Uptime handler - reports how long the process has been running.
pub async fn uptime(State(state): State<AppState>, responder: Responder) -> ApiResponse {
    let uptime = humanize_duration(state.probe.uptime());

    responder.success(ResponseInput::message(format!(
        "Server has been running for {}",
        uptime
    )))
}

/// Memory usage handler - reports process memory counters in megabytes.
pub async fn memory_usage(
    State(state): State<AppState>,
    responder: Responder,
) -> Result<ApiResponse, ApiError> {
    let probe = state.probe.clone();
    let memory = tokio::task::spawn_blocking(move || probe.memory()).await??;
    debug!(?memory, "memory snapshot");

    Ok(responder.success(ResponseInput::message(json!({
        "rss": format_megabytes(memory.rss),
        "heapTotal": format_megabytes(memory.heap_total),
        "heapUsed": format_megabytes(memory.heap_used),
        "external": format_megabytes(memory.external),
    }))))
}

/// CPU usage handler - reports each core's time split since boot.
pub async fn cpu_usage(
    State(state): State<AppState>,
    responder: Responder,
) -> Result<ApiResponse, ApiError> {
    let probe = state.probe.clone();
    let cpus = tokio::task::spawn_blocking(move || probe.cpus()).await??;

    let reports: Vec<CpuReport> = cpus
        .into_iter()
        .enumerate()
        .map(|(index, cpu)| CpuReport {
            cpu: index + 1,
            usage: cpu_usage_percentages(&cpu.times),
            model: cpu.model,
            speed: cpu.speed,
        })
        .collect();

    Ok(responder.success(ResponseInput::message(serde_json::to_value(reports)?)))
}

/// Fallback handler for unknown paths.
pub async fn not_found(responder: Responder) -> ApiResponse {
    responder.record_not_found(ResponseInput::default())
}

/// Fallback for a known path requested with the wrong method.
pub async fn method_not_allowed(responder: Responder) -> Response {
    let reply = responder.bad_request(ResponseInput::message("Method not allowed"));
    (StatusCode::METHOD_NOT_ALLOWED, reply).into_response()
}
