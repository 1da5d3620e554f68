//! Application state shared across all handlers.

use std::sync::Arc;
use std::time::Instant;

use filerelay_core::config::AppConfig;
use filerelay_core::traits::Authenticator;
use filerelay_realtime::RelayEngine;

/// Application state passed to every handler via `State<AppState>`.
///
/// All fields are cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Relay engine (gateway, registry, metrics)
    pub engine: RelayEngine,
    /// Verifies connection and request credentials
    pub authenticator: Arc<dyn Authenticator>,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    /// Creates the state.
    pub fn new(config: AppConfig, engine: RelayEngine, authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            config: Arc::new(config),
            engine,
            authenticator,
            started_at: Instant::now(),
        }
    }
}
