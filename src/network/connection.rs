//! Connection accounting
//!
//! Tracks live client connections for the limit check at accept time and
//! for shutdown draining. The handler task owns its socket; the pool holds
//! only metadata.

use crate::error::{Result, ScoreKvError};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::debug;
use uuid::Uuid;

/// Metadata for one live client connection
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub client_id: Uuid,
    pub remote_addr: SocketAddr,
    pub connected_at: Instant,
}

impl ConnectionInfo {
    pub fn new(client_id: Uuid, remote_addr: SocketAddr) -> Self {
        Self {
            client_id,
            remote_addr,
            connected_at: Instant::now(),
        }
    }
}

/// Registry of live connections with a hard cap
pub struct ConnectionPool {
    connections: DashMap<Uuid, ConnectionInfo>,
    max_connections: usize,
    total_accepted: AtomicU64,
    total_rejected: AtomicU64,
}

impl ConnectionPool {
    pub fn new(max_connections: usize) -> Self {
        Self {
            connections: DashMap::new(),
            max_connections,
            total_accepted: AtomicU64::new(0),
            total_rejected: AtomicU64::new(0),
        }
    }

    /// Admit a connection, or refuse when the pool is at capacity.
    pub fn register(&self, info: ConnectionInfo) -> Result<()> {
        if self.connections.len() >= self.max_connections {
            self.total_rejected.fetch_add(1, Ordering::Relaxed);
            return Err(ScoreKvError::NetworkError {
                message: format!(
                    "connection limit of {} reached",
                    self.max_connections
                ),
                source: None,
                connection_id: Some(info.client_id.to_string()),
            });
        }
        let client_id = info.client_id;
        self.connections.insert(client_id, info);
        self.total_accepted.fetch_add(1, Ordering::Relaxed);
        debug!(
            "registered connection {} (active: {})",
            client_id,
            self.connections.len()
        );
        Ok(())
    }

    /// Forget a connection when its handler finishes.
    pub fn release(&self, client_id: Uuid) {
        if self.connections.remove(&client_id).is_some() {
            debug!(
                "released connection {} (active: {})",
                client_id,
                self.connections.len()
            );
        }
    }

    pub fn active_connections(&self) -> usize {
        self.connections.len()
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    pub fn stats(&self) -> ConnectionPoolStats {
        ConnectionPoolStats {
            active_connections: self.connections.len(),
            max_connections: self.max_connections,
            total_accepted: self.total_accepted.load(Ordering::Relaxed),
            total_rejected: self.total_rejected.load(Ordering::Relaxed),
        }
    }
}

/// Connection pool statistics
#[derive(Debug, Clone)]
pub struct ConnectionPoolStats {
    pub active_connections: usize,
    pub max_connections: usize,
    pub total_accepted: u64,
    pub total_rejected: u64,
}
