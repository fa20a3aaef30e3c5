//! Connection tracking for DoS protection
//!
//! Limits concurrent connections per IP address so a single host cannot
//! exhaust broker resources. A limit of 0 means unlimited.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Tracks active connections per IP address
#[derive(Debug)]
pub struct ConnectionTracker {
    /// Map of IP addresses to their current connection count
    connections: Arc<Mutex<HashMap<IpAddr, usize>>>,
    /// Maximum connections allowed per IP (0 = unlimited)
    max_per_ip: AtomicUsize,
}

impl ConnectionTracker {
    /// Create a new connection tracker with the specified limit
    ///
    /// A limit of 0 means unlimited connections are allowed.
    #[must_use]
    pub fn new(max_per_ip: usize) -> Self {
        Self {
            connections: Arc::new(Mutex::new(HashMap::new())),
            max_per_ip: AtomicUsize::new(max_per_ip),
        }
    }

    /// Try to acquire a connection slot for the given IP
    ///
    /// Returns `Some(ConnectionGuard)` if the connection is allowed, or
    /// `None` if the IP has reached its limit. The guard releases the slot
    /// when dropped, so slots cannot leak on early returns.
    pub fn try_acquire(&self, ip: IpAddr) -> Option<ConnectionGuard> {
        let max = self.max_per_ip.load(Ordering::Relaxed);
        let mut connections = self.connections.lock().expect("connection tracker lock");
        let count = connections.entry(ip).or_insert(0);

        // 0 means unlimited
        if max > 0 && *count >= max {
            return None;
        }

        *count += 1;
        Some(ConnectionGuard {
            ip,
            connections: self.connections.clone(),
        })
    }
}

/// RAII guard that releases a connection slot when dropped
#[derive(Debug)]
pub struct ConnectionGuard {
    ip: IpAddr,
    connections: Arc<Mutex<HashMap<IpAddr, usize>>>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let mut connections = self.connections.lock().expect("connection tracker lock");
        if let Some(count) = connections.get_mut(&self.ip) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                connections.remove(&self.ip);
            }
        }
    }
}
