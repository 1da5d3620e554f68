//! Top-level relay engine that ties together registry, gateway and metrics.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;

use filerelay_core::config::RealtimeConfig;
use filerelay_core::error::AppError;

use crate::gateway::relay::RelayGateway;
use crate::metrics::RelayMetrics;
use crate::presence::registry::{MemoryPresenceRegistry, PresenceRegistry};

/// Central relay engine.
///
/// Owns the presence registry explicitly; [`RelayEngine::shutdown`] clears
/// it along with every connection.
#[derive(Clone)]
pub struct RelayEngine {
    /// Transport gateway.
    pub gateway: Arc<RelayGateway>,
    /// Presence registry shared with the gateway.
    pub registry: Arc<dyn PresenceRegistry>,
    /// Metrics collector.
    pub metrics: Arc<RelayMetrics>,
    /// Shutdown signal sender.
    shutdown_tx: broadcast::Sender<()>,
}

impl std::fmt::Debug for RelayEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayEngine")
            .field("connections", &self.gateway.connection_count())
            .field("online", &self.registry.len())
            .finish()
    }
}

impl RelayEngine {
    /// Creates an engine with an in-memory presence registry.
    pub fn new(config: RealtimeConfig) -> Self {
        Self::with_registry(config, Arc::new(MemoryPresenceRegistry::new()))
    }

    /// Creates an engine over the given registry.
    pub fn with_registry(config: RealtimeConfig, registry: Arc<dyn PresenceRegistry>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let metrics = Arc::new(RelayMetrics::new());
        let gateway = Arc::new(RelayGateway::new(
            config,
            registry.clone(),
            metrics.clone(),
        ));

        info!("Relay engine initialized");

        Self {
            gateway,
            registry,
            metrics,
            shutdown_tx,
        }
    }

    /// Returns a shutdown receiver for connection tasks.
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Signals connection tasks to stop, closes every connection and clears
    /// the registry.
    pub async fn shutdown(&self) -> Result<(), AppError> {
        info!("Shutting down relay engine");

        let _ = self.shutdown_tx.send(());
        self.gateway.close_all().await;

        info!("Relay engine shut down");
        Ok(())
    }
}
