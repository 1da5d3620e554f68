//! Ping/pong heartbeat for WebSocket keepalive.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time;

use filerelay_core::config::RealtimeConfig;

use super::handle::ConnectionHandle;
use crate::message::types::OutboundMessage;

/// Heartbeat configuration
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Interval between pings
    pub ping_interval: Duration,
    /// Timeout before considering connection dead
    pub ping_timeout: Duration,
}

impl From<&RealtimeConfig> for HeartbeatConfig {
    fn from(config: &RealtimeConfig) -> Self {
        Self {
            ping_interval: Duration::from_secs(config.ping_interval_seconds.max(1)),
            ping_timeout: Duration::from_secs(config.ping_timeout_seconds.max(1)),
        }
    }
}

/// Run heartbeat loop for a connection.
///
/// Sends periodic pings and checks for pong responses. Returns once the
/// connection is dead; the caller closes the socket.
pub async fn run_heartbeat(handle: Arc<ConnectionHandle>, config: HeartbeatConfig) {
    let mut interval = time::interval(config.ping_interval);
    // The first tick completes immediately.
    interval.tick().await;

    loop {
        interval.tick().await;

        if !handle.is_alive() {
            break;
        }

        let elapsed = handle.millis_since_pong();
        if elapsed > config.ping_timeout.as_millis() as u64 {
            tracing::warn!(
                conn_id = %handle.id,
                elapsed_ms = elapsed,
                "Heartbeat timeout"
            );
            handle.mark_dead();
            break;
        }

        let ping = OutboundMessage::Ping {
            timestamp: Utc::now().timestamp_millis(),
        };

        // A full queue counts as a missed ping; the pong timeout reaps it.
        match handle.try_send(ping) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::debug!(conn_id = %handle.id, "Outbound queue full, ping skipped");
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(conn_id = %handle.id, "Ping send failed, marking dead");
                handle.mark_dead();
                break;
            }
        }
    }

    tracing::debug!(conn_id = %handle.id, "Heartbeat loop ended");
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    fn config() -> HeartbeatConfig {
        HeartbeatConfig {
            ping_interval: Duration::from_secs(1),
            ping_timeout: Duration::from_secs(3600),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_pings_until_the_outbound_queue_closes() {
        let (tx, mut rx) = mpsc::channel(4);
        let handle = Arc::new(ConnectionHandle::new(None, tx));
        let task = tokio::spawn(run_heartbeat(handle.clone(), config()));

        let first = rx.recv().await.expect("ping");
        assert!(matches!(first, OutboundMessage::Ping { .. }));

        drop(rx);
        task.await.expect("heartbeat task");
        assert!(!handle.is_alive());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_for_dead_connection() {
        let (tx, mut rx) = mpsc::channel(4);
        let handle = Arc::new(ConnectionHandle::new(None, tx));
        handle.mark_dead();

        run_heartbeat(handle, config()).await;

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reaps_connection_whose_queue_stays_full() {
        let (tx, _rx) = mpsc::channel(1);
        let handle = Arc::new(ConnectionHandle::new(None, tx));
        assert!(handle.send(OutboundMessage::Ping { timestamp: 0 }).await);

        let config = HeartbeatConfig {
            ping_interval: Duration::from_secs(1),
            ping_timeout: Duration::from_secs(3),
        };
        let finished =
            tokio::time::timeout(Duration::from_secs(60), run_heartbeat(handle.clone(), config))
                .await;

        assert!(finished.is_ok());
        assert!(!handle.is_alive());
    }
}
