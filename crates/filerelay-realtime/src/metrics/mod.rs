//! Relay engine metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Relay-level metrics counters.
#[derive(Debug, Default)]
pub struct RelayMetrics {
    /// Total connections established
    pub connections_total: AtomicU64,
    /// Connections currently open
    pub connections_active: AtomicU64,
    /// Inbound events accepted for dispatch
    pub events_received: AtomicU64,
    /// Events forwarded to a resolved recipient
    pub events_relayed: AtomicU64,
    /// Events dropped because the recipient was not online
    pub events_dropped: AtomicU64,
    /// Roster broadcasts performed
    pub roster_broadcasts: AtomicU64,
}

impl RelayMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new connection
    pub fn record_connect(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a disconnection
    pub fn record_disconnect(&self) {
        // Saturating so a double unregister cannot wrap the gauge.
        let _ = self
            .connections_active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    /// Record an accepted inbound event
    pub fn inc_received(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a relayed event
    pub fn inc_relayed(&self) {
        self.events_relayed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a dropped event
    pub fn inc_dropped(&self) {
        self.events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a roster broadcast
    pub fn inc_roster_broadcasts(&self) {
        self.roster_broadcasts.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            events_received: self.events_received.load(Ordering::Relaxed),
            events_relayed: self.events_relayed.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            roster_broadcasts: self.roster_broadcasts.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Total connections ever established
    pub connections_total: u64,
    /// Currently active connections
    pub connections_active: u64,
    /// Inbound events accepted for dispatch
    pub events_received: u64,
    /// Events forwarded to a resolved recipient
    pub events_relayed: u64,
    /// Events dropped for lack of a recipient
    pub events_dropped: u64,
    /// Roster broadcasts performed
    pub roster_broadcasts: u64,
}
