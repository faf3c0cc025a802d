//! WebSocket endpoint relaying `message` events to every client.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::header::ORIGIN;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use futures::{Future, SinkExt, StreamExt};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::connections::{ConnectionSet, Frame};
use crate::api::AppState;
use crate::response::{Responder, ResponseInput};
use crate::server::ShutdownSignal;

/// Task name reported when a connection task panics.
const CONNECTION_TASK: &str = "realtime connection";

/// Upgrade handler for the realtime endpoint.
pub async fn socket_upgrade(
    State(state): State<AppState>,
    responder: Responder,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    if let Some(allowed) = state.config.allowed_origin() {
        if !origin_allowed(&headers, allowed) {
            warn!(allowed, "rejected realtime upgrade from disallowed origin");
            return responder
                .unauthorized(ResponseInput::message("Origin not allowed"))
                .into_response();
        }
    }

    let connections = state.connections.clone();
    let shutdown = state.shutdown.clone();
    ws.on_upgrade(move |socket| async move {
        spawn_connection(&shutdown, run_connection(socket, connections));
    })
}

/// Run a connection on its own task; a panic in it shuts the process down.
fn spawn_connection<F>(shutdown: &ShutdownSignal, connection: F) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    shutdown.supervise_panics(CONNECTION_TASK, tokio::spawn(connection))
}

/// Wait for the writer task and re-raise its panic on the connection task.
async fn finish_writer(writer: JoinHandle<()>) {
    if let Err(e) = writer.await {
        if e.is_panic() {
            std::panic::resume_unwind(e.into_panic());
        }
    }
}

/// Browsers always send `Origin`; other clients may omit it.
fn origin_allowed(headers: &HeaderMap, allowed: &str) -> bool {
    match headers.get(ORIGIN).and_then(|value| value.to_str().ok()) {
        Some(origin) => origin.trim_end_matches('/') == allowed.trim_end_matches('/'),
        None => true,
    }
}

async fn run_connection(socket: WebSocket, connections: ConnectionSet) {
    let (id, mut outbound) = connections.register();
    info!(connection_id = %id, "New client connected");

    let (mut sink, mut stream) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            let message = match frame {
                Frame::Text(text) => Message::Text(text),
                Frame::Binary(bytes) => Message::Binary(bytes),
            };
            if sink.send(message).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => {
                info!(connection_id = %id, message = %text, "Message received");
                connections.broadcast(Frame::Text(text));
            }
            Ok(Message::Binary(bytes)) => {
                info!(connection_id = %id, bytes = bytes.len(), "Message received");
                connections.broadcast(Frame::Binary(bytes));
            }
            Ok(Message::Close(_)) => break,
            // Pings are answered by the transport.
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Err(e) => {
                debug!(connection_id = %id, error = %e, "realtime stream error");
                break;
            }
        }
    }

    connections.remove(&id);
    info!(connection_id = %id, "Client disconnected");
    finish_writer(writer).await;
}
