//! Response DTOs.

use serde::{Deserialize, Serialize};

use filerelay_core::types::PublicProfile;
use filerelay_realtime::MetricsSnapshot;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Basic health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status string.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Seconds since start.
    pub uptime_seconds: u64,
}

/// Detailed health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedHealthResponse {
    /// Status string.
    pub status: String,
    /// Seconds since start.
    pub uptime_seconds: u64,
    /// Open WebSocket connections, joined or not.
    pub ws_connections: usize,
    /// Joined users.
    pub online_users: usize,
    /// Streams between offer and complete/abort.
    pub open_streams: usize,
    /// Relay counters.
    pub relay: MetricsSnapshot,
}

/// Current roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceResponse {
    /// Joined users in join order.
    pub users: Vec<PublicProfile>,
    /// Number of joined users.
    pub count: usize,
}
