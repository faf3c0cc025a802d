//! Set of live realtime connections and fan-out broadcast.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::metrics;

/// Identifier assigned to a connection when it is accepted.
pub type ConnectionId = Uuid;

/// Payload relayed between clients, forwarded byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

/// Live connections keyed by id, each with its outbound queue.
///
/// Queues are unbounded: a slow receiver never holds up the broadcaster or
/// the other receivers.
#[derive(Debug, Clone, Default)]
pub struct ConnectionSet {
    inner: Arc<DashMap<ConnectionId, mpsc::UnboundedSender<Frame>>>,
}

impl ConnectionSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a new connection, returning its id and the queue to drain.
    pub fn register(&self) -> (ConnectionId, mpsc::UnboundedReceiver<Frame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        self.inner.insert(id, tx);

        metrics::inc_realtime_connections();
        metrics::set_realtime_active(self.inner.len());

        (id, rx)
    }

    /// Drop a connection. Returns whether it was present.
    pub fn remove(&self, id: &ConnectionId) -> bool {
        let removed = self.inner.remove(id).is_some();
        metrics::set_realtime_active(self.inner.len());
        removed
    }

    /// Queue `frame` for every connection, returning how many accepted it.
    pub fn broadcast(&self, frame: Frame) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();

        for entry in self.inner.iter() {
            if entry.value().send(frame.clone()).is_ok() {
                delivered += 1;
            } else {
                closed.push(*entry.key());
            }
        }

        // Removal must wait until the iterator's shard guards are released.
        for id in closed {
            debug!(connection_id = %id, "dropping closed connection");
            self.inner.remove(&id);
        }

        metrics::inc_realtime_broadcasts();
        delivered
    }

    /// Disconnect everyone. Outbound queues close, which ends each writer.
    pub fn close_all(&self) -> usize {
        let count = self.inner.len();
        self.inner.clear();
        metrics::set_realtime_active(0);
        count
    }

    /// Whether `id` is connected.
    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.inner.contains_key(id)
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether no connection is live.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
