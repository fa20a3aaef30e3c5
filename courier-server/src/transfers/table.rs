//! Transfer request table
//!
//! Tracks every in-flight transfer offer from creation to retirement. A
//! request moves `Pending -> AwaitingStream -> Active`; terminal outcomes
//! (completed, denied, cancelled, expired) remove the entry instead of
//! parking it in a terminal state, so holding an id after retirement is a
//! normal lookup miss, never a stale record.
//!
//! Every transition is a single critical section over one mutex, which is
//! what guarantees no request is mutated by two handlers interleaved.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::registry::ConnId;

/// Lifecycle state of a tracked request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Offered, waiting for the destination to accept or deny
    Pending,
    /// Accepted; waiting for the source to open its byte stream
    AwaitingStream,
    /// Byte stream arrived; relay in progress or awaiting the receiver's
    /// done signal
    Active,
}

/// One tracked transfer offer
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    /// Process-unique id, assigned at creation, never reused
    pub id: u64,
    /// The offering connection. Immutable after construction.
    pub source: ConnId,
    /// The receiving connection. Immutable after construction.
    pub dest: ConnId,
    /// File name offered by the sender
    pub source_file: String,
    /// File name chosen by the receiver at accept time
    pub dest_file: Option<String>,
    /// Declared payload size; drives progress percentages only, never
    /// enforced as a limit
    pub expected_len: u64,
    /// Current lifecycle state
    pub state: RequestState,
    /// Creation time, for idle-request expiry
    pub created_at: Instant,
}

impl TransferRequest {
    /// The other party of this request, given one of the two
    ///
    /// Returns None if `conn_id` is not a party to the request.
    pub fn peer_of(&self, conn_id: ConnId) -> Option<ConnId> {
        if conn_id == self.source {
            Some(self.dest)
        } else if conn_id == self.dest {
            Some(self.source)
        } else {
            None
        }
    }
}

/// Why a state transition was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferError {
    /// No request with that id exists (never created, or already retired)
    NotFound,
    /// The request exists but is not in the state this event requires
    WrongState,
    /// The event came from a connection that may not drive this transition
    WrongPeer,
}

/// Table of all in-flight transfer requests
///
/// Ids start at 0 and grow monotonically for the life of the process.
pub struct TransferTable {
    requests: Mutex<HashMap<u64, TransferRequest>>,
    next_id: AtomicU64,
}

impl TransferTable {
    /// Create a new empty table
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Create a new pending request and return a snapshot of it
    pub fn create(
        &self,
        source: ConnId,
        dest: ConnId,
        source_file: String,
        expected_len: u64,
    ) -> TransferRequest {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = TransferRequest {
            id,
            source,
            dest,
            source_file,
            dest_file: None,
            expected_len,
            state: RequestState::Pending,
            created_at: Instant::now(),
        };

        self.requests
            .lock()
            .expect("transfer table lock poisoned")
            .insert(id, request.clone());

        request
    }

    /// Look up a request snapshot by id
    ///
    /// An absent id is a normal case the caller must handle.
    pub fn get(&self, id: u64) -> Option<TransferRequest> {
        self.requests
            .lock()
            .expect("transfer table lock poisoned")
            .get(&id)
            .cloned()
    }

    /// Accept a pending request: record the receiver's file name and move to
    /// `AwaitingStream`
    ///
    /// Only the request's destination may accept, and only from `Pending`.
    pub fn accept(
        &self,
        id: u64,
        caller: ConnId,
        dest_file: String,
    ) -> Result<TransferRequest, TransferError> {
        let mut requests = self.requests.lock().expect("transfer table lock poisoned");
        let request = requests.get_mut(&id).ok_or(TransferError::NotFound)?;

        if request.dest != caller {
            return Err(TransferError::WrongPeer);
        }
        if request.state != RequestState::Pending {
            return Err(TransferError::WrongState);
        }

        request.dest_file = Some(dest_file);
        request.state = RequestState::AwaitingStream;
        Ok(request.clone())
    }

    /// Mark the stream as arrived: move from `AwaitingStream` to `Active`
    ///
    /// Only the request's source may open the stream. A request transitions
    /// to `Active` at most once; there is no way back.
    pub fn begin_stream(&self, id: u64, caller: ConnId) -> Result<TransferRequest, TransferError> {
        let mut requests = self.requests.lock().expect("transfer table lock poisoned");
        let request = requests.get_mut(&id).ok_or(TransferError::NotFound)?;

        if request.source != caller {
            return Err(TransferError::WrongPeer);
        }
        if request.state != RequestState::AwaitingStream {
            return Err(TransferError::WrongState);
        }

        request.state = RequestState::Active;
        Ok(request.clone())
    }

    /// Complete an active transfer: retire the request
    ///
    /// Only the request's destination may signal completion, and only from
    /// `Active`.
    pub fn finish(&self, id: u64, caller: ConnId) -> Result<TransferRequest, TransferError> {
        let mut requests = self.requests.lock().expect("transfer table lock poisoned");
        let request = requests.get(&id).ok_or(TransferError::NotFound)?;

        if request.dest != caller {
            return Err(TransferError::WrongPeer);
        }
        if request.state != RequestState::Active {
            return Err(TransferError::WrongState);
        }

        Ok(requests.remove(&id).expect("checked above"))
    }

    /// Deny a pending request: retire it
    ///
    /// Only the request's destination may deny, and only from `Pending`.
    pub fn deny(&self, id: u64, caller: ConnId) -> Result<TransferRequest, TransferError> {
        let mut requests = self.requests.lock().expect("transfer table lock poisoned");
        let request = requests.get(&id).ok_or(TransferError::NotFound)?;

        if request.dest != caller {
            return Err(TransferError::WrongPeer);
        }
        if request.state != RequestState::Pending {
            return Err(TransferError::WrongState);
        }

        Ok(requests.remove(&id).expect("checked above"))
    }

    /// Remove a request unconditionally
    ///
    /// Removal is exactly-once: a second call for the same id is a no-op
    /// returning None.
    pub fn remove(&self, id: u64) -> Option<TransferRequest> {
        self.requests
            .lock()
            .expect("transfer table lock poisoned")
            .remove(&id)
    }

    /// Remove every request referencing a connection
    ///
    /// Disconnect cleanup: returns the removed requests so the caller can
    /// notify each surviving peer.
    pub fn remove_for_conn(&self, conn_id: ConnId) -> Vec<TransferRequest> {
        let mut requests = self.requests.lock().expect("transfer table lock poisoned");
        let ids: Vec<u64> = requests
            .values()
            .filter(|r| r.source == conn_id || r.dest == conn_id)
            .map(|r| r.id)
            .collect();

        ids.into_iter()
            .filter_map(|id| requests.remove(&id))
            .collect()
    }

    /// Remove requests that sat unanswered longer than `ttl`
    ///
    /// Only `Pending` and `AwaitingStream` requests expire; an `Active`
    /// relay runs as long as bytes flow.
    pub fn remove_expired(&self, ttl: Duration) -> Vec<TransferRequest> {
        let mut requests = self.requests.lock().expect("transfer table lock poisoned");
        let ids: Vec<u64> = requests
            .values()
            .filter(|r| r.state != RequestState::Active && r.created_at.elapsed() >= ttl)
            .map(|r| r.id)
            .collect();

        ids.into_iter()
            .filter_map(|id| requests.remove(&id))
            .collect()
    }

    /// Number of in-flight requests
    pub fn len(&self) -> usize {
        self.requests
            .lock()
            .expect("transfer table lock poisoned")
            .len()
    }

    /// True if no requests are in flight
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TransferTable {
    fn default() -> Self {
        Self::new()
    }
}
