//! Individual WebSocket connection handle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, mpsc};
use tokio::time::Instant;

use filerelay_core::types::{ConnectionId, VerifiedIdentity};

use crate::message::types::OutboundMessage;

/// A handle to a single live connection.
///
/// Holds the sender side of the connection's outbound queue plus the
/// identity verified on upgrade. The queue is bounded and FIFO; sending
/// waits for capacity instead of dropping, so relayed events keep their
/// order.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Transport-assigned connection ID
    pub id: ConnectionId,
    /// Identity verified on upgrade (`None` for anonymous connections)
    pub identity: Option<VerifiedIdentity>,
    /// Sender for outbound messages
    sender: mpsc::Sender<OutboundMessage>,
    /// When the connection was established
    pub connected_at: DateTime<Utc>,
    /// Monotonic origin for pong bookkeeping
    opened: Instant,
    /// Last pong received, in ms since `opened`
    last_pong_ms: AtomicU64,
    /// Highest roster version queued on this connection
    roster_version: AtomicU64,
    /// Held while a roster snapshot is being queued
    roster_gate: Mutex<()>,
    /// Whether the connection is still alive
    alive: AtomicBool,
}

impl ConnectionHandle {
    /// Create a new connection handle
    pub fn new(identity: Option<VerifiedIdentity>, sender: mpsc::Sender<OutboundMessage>) -> Self {
        Self {
            id: ConnectionId::new(),
            identity,
            sender,
            connected_at: Utc::now(),
            opened: Instant::now(),
            last_pong_ms: AtomicU64::new(0),
            roster_version: AtomicU64::new(0),
            roster_gate: Mutex::new(()),
            alive: AtomicBool::new(true),
        }
    }

    /// Queue an outbound message for this connection.
    ///
    /// Returns `false` when the connection is closed.
    pub async fn send(&self, msg: OutboundMessage) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.send(msg).await {
            Ok(()) => true,
            Err(_) => {
                tracing::debug!(conn_id = %self.id, "Outbound queue closed");
                self.mark_dead();
                false
            }
        }
    }

    /// Queue an outbound message only if there is room right now.
    ///
    /// A closed queue marks the connection dead.
    pub fn try_send(&self, msg: OutboundMessage) -> Result<(), TrySendError<OutboundMessage>> {
        if !self.is_alive() {
            return Err(TrySendError::Closed(msg));
        }
        let result = self.sender.try_send(msg);
        if let Err(TrySendError::Closed(_)) = &result {
            tracing::debug!(conn_id = %self.id, "Outbound queue closed");
            self.mark_dead();
        }
        result
    }

    /// Queue roster snapshot `version` without waiting.
    ///
    /// When the queue is full the snapshot is queued from a background task
    /// instead. A connection never receives an older snapshot after a newer
    /// one; snapshots superseded while waiting are skipped.
    pub fn push_roster(self: &Arc<Self>, version: u64, msg: OutboundMessage) {
        let msg = match self.roster_gate.try_lock() {
            Ok(_gate) => match self.try_send(msg) {
                Ok(()) => {
                    self.roster_version.fetch_max(version, Ordering::SeqCst);
                    return;
                }
                Err(TrySendError::Closed(_)) => return,
                Err(TrySendError::Full(msg)) => msg,
            },
            Err(_) => msg,
        };

        tracing::debug!(conn_id = %self.id, version, "Outbound queue full, roster deferred");
        let handle = Arc::clone(self);
        tokio::spawn(async move {
            let _gate = handle.roster_gate.lock().await;
            if handle.roster_version.load(Ordering::SeqCst) >= version {
                return;
            }
            if handle.send(msg).await {
                handle.roster_version.fetch_max(version, Ordering::SeqCst);
            }
        });
    }

    /// Check if connection is alive
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark connection as dead
    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Record a pong response
    pub fn record_pong(&self) {
        self.last_pong_ms
            .store(self.opened.elapsed().as_millis() as u64, Ordering::SeqCst);
    }

    /// Milliseconds since the last pong (or since the connection opened)
    pub fn millis_since_pong(&self) -> u64 {
        let now = self.opened.elapsed().as_millis() as u64;
        now.saturating_sub(self.last_pong_ms.load(Ordering::SeqCst))
    }
}
