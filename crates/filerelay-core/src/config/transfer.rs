//! Transfer session configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Bytes reserved for the `{"type":"chunk","to":...}` envelope around an
/// encoded chunk.
pub const CHUNK_FRAME_OVERHEAD: usize = 1024;

/// Settings for the sender and receiver transfer sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Size of each chunk emitted by the sender.
    #[serde(default = "default_chunk_size")]
    pub chunk_size_bytes: usize,
    /// Cooperative delay between chunk emissions, in milliseconds.
    #[serde(default = "default_pacing_delay")]
    pub pacing_delay_ms: u64,
    /// Check the roster once before a batch and fail fast if the recipient
    /// is offline. When false, each event is simply dropped by the relay.
    #[serde(default)]
    pub verify_recipient: bool,
    /// Seconds of inactivity after which a receiver discards a pending offer
    /// or partial buffer.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u64,
    /// Upper bound on one transfer-log write, in seconds.
    #[serde(default = "default_log_timeout")]
    pub log_timeout_seconds: u64,
    /// Directory received artifacts are written to.
    #[serde(default = "default_download_dir")]
    pub download_dir: String,
    /// Endpoint of the transfer history service; logging is disabled when unset.
    #[serde(default)]
    pub history_url: Option<String>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size_bytes: default_chunk_size(),
            pacing_delay_ms: default_pacing_delay(),
            verify_recipient: false,
            idle_timeout_seconds: default_idle_timeout(),
            log_timeout_seconds: default_log_timeout(),
            download_dir: default_download_dir(),
            history_url: None,
        }
    }
}

impl TransferConfig {
    /// Pacing delay as a [`Duration`].
    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_delay_ms)
    }

    /// Receiver idle timeout as a [`Duration`].
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_seconds)
    }

    /// Size of a chunk frame on the wire: base64 payload plus
    /// [`CHUNK_FRAME_OVERHEAD`] for the JSON envelope.
    pub fn chunk_frame_bytes(&self) -> usize {
        self.chunk_size_bytes.div_ceil(3) * 4 + CHUNK_FRAME_OVERHEAD
    }

    /// Transfer-log timeout as a [`Duration`].
    pub fn log_timeout(&self) -> Duration {
        Duration::from_secs(self.log_timeout_seconds)
    }
}

fn default_chunk_size() -> usize {
    512 * 1024
}

fn default_pacing_delay() -> u64 {
    5
}

fn default_idle_timeout() -> u64 {
    120
}

fn default_log_timeout() -> u64 {
    10
}

fn default_download_dir() -> String {
    "downloads".to_string()
}
