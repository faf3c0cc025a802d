//! Diagnostic HTTP server.
//!
//! Exposes four read-only endpoints describing the running process and its
//! host, wrapped in a uniform JSON envelope:
//!
//! ```text
//! GET /server-health   process id and today's date
//! GET /uptime          humanized time since startup
//! GET /memory-usage    rss, heapTotal, heapUsed, external (MB)
//! GET /cpu-usage       per-core time split since boot
//! ```
//!
//! Every reply has the shape `{status, message, data}`. A WebSocket endpoint
//! rebroadcasts every message it receives to all connected clients.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`response`]: Response envelope and the per-request responder
//! - [`system`]: Process and host introspection
//! - [`middleware`]: Request middleware stack
//! - [`realtime`]: WebSocket broadcast transport
//! - [`api`]: Routes and handlers
//! - [`server`]: Runtime lifecycle and graceful shutdown
//! - [`metrics`]: Request and realtime metrics

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod realtime;
pub mod response;
pub mod server;
pub mod system;

pub use config::Config;
pub use error::{Result, ServerError};
