//! Transfer history collaborator.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::TransferRecord;

/// Receives one record per completed file.
///
/// Callers treat this as fire-and-forget: failures are logged and never
/// block the user-visible completion signal.
#[async_trait]
pub trait TransferLog: Send + Sync + std::fmt::Debug + 'static {
    /// Persist a transfer record.
    async fn record(&self, record: TransferRecord) -> AppResult<()>;
}
