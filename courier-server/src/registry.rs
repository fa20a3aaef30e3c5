//! Connection registry: the arena of live peer sessions
//!
//! Every accepted connection gets a stable [`ConnId`] and a [`PeerSession`]
//! record at connect time; the record is removed exactly when the connection
//! task ends. Display names are claimed later via registration and are not
//! required to be unique - with duplicates, name lookup returns an
//! unspecified matching session.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use tokio::sync::{RwLock, mpsc};

use courier_common::framing::MessageId;
use courier_common::protocol::ServerMessage;

/// Stable identifier for one live connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(u32);

impl ConnId {
    /// Get the inner ID value
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for ConnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One item queued for delivery to a connection
///
/// The connection task drains its queue and writes each item as a complete
/// frame, so event messages and data chunks never interleave mid-frame.
#[derive(Debug)]
pub enum Outbound {
    /// A protocol message; `Some(id)` echoes a request's message ID
    Message(ServerMessage, Option<MessageId>),
    /// One raw chunk of relayed stream bytes
    Chunk(Vec<u8>),
}

/// A live connection's arena record
#[derive(Debug, Clone)]
pub struct PeerSession {
    /// Stable connection identifier
    pub conn_id: ConnId,
    /// Remote address
    pub addr: SocketAddr,
    /// Display name, set by registration; None until then
    pub name: Option<String>,
    /// Queue sender for outbound frames to this connection
    pub tx: mpsc::UnboundedSender<Outbound>,
}

/// Registry of all live connections
#[derive(Debug, Clone)]
pub struct PeerRegistry {
    peers: Arc<RwLock<HashMap<ConnId, PeerSession>>>,
    next_id: Arc<AtomicU32>,
}

impl PeerRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            peers: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicU32::new(1)),
        }
    }

    /// Add a connection record and return its assigned ID
    pub async fn add(&self, addr: SocketAddr, tx: mpsc::UnboundedSender<Outbound>) -> ConnId {
        let conn_id = ConnId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let session = PeerSession {
            conn_id,
            addr,
            name: None,
            tx,
        };
        self.peers.write().await.insert(conn_id, session);
        conn_id
    }

    /// Set (or overwrite) the display name for a connection
    ///
    /// Re-registration silently replaces the previous name. Returns false
    /// if the connection record no longer exists.
    pub async fn set_name(&self, conn_id: ConnId, name: String) -> bool {
        let mut peers = self.peers.write().await;
        match peers.get_mut(&conn_id) {
            Some(session) => {
                session.name = Some(name);
                true
            }
            None => false,
        }
    }

    /// Remove a connection record
    ///
    /// Called on disconnect. No-op (returning None) if already absent.
    pub async fn remove(&self, conn_id: ConnId) -> Option<PeerSession> {
        self.peers.write().await.remove(&conn_id)
    }

    /// Get a connection record by ID
    pub async fn get(&self, conn_id: ConnId) -> Option<PeerSession> {
        self.peers.read().await.get(&conn_id).cloned()
    }

    /// Display names of all registered connections
    ///
    /// Unregistered connections contribute nothing. Order is the map's own
    /// iteration order, not sorted and not stable across reconnects.
    pub async fn names(&self) -> Vec<String> {
        let peers = self.peers.read().await;
        peers.values().filter_map(|s| s.name.clone()).collect()
    }

    /// Find a connection by display name (exact match)
    ///
    /// Linear scan. If several connections share the name, which one is
    /// returned is unspecified.
    pub async fn find_by_name(&self, name: &str) -> Option<PeerSession> {
        let peers = self.peers.read().await;
        peers
            .values()
            .find(|s| s.name.as_deref() == Some(name))
            .cloned()
    }

    /// Queue a message for a connection
    ///
    /// Returns false if the connection is gone or its queue is closed.
    pub async fn send_to(
        &self,
        conn_id: ConnId,
        message: ServerMessage,
        message_id: Option<MessageId>,
    ) -> bool {
        let peers = self.peers.read().await;
        match peers.get(&conn_id) {
            Some(session) => session.tx.send(Outbound::Message(message, message_id)).is_ok(),
            None => false,
        }
    }

    /// Number of live connection records
    pub async fn count(&self) -> usize {
        self.peers.read().await.len()
    }
}

impl Default for PeerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
