//! Realtime transport: a WebSocket endpoint that rebroadcasts every
//! `message` event to all connected clients, sender included.
//!
//! No filtering, persistence or delivery guarantees.

pub mod connections;
pub mod socket;

pub use connections::{ConnectionId, ConnectionSet, Frame};
pub use socket::socket_upgrade;
