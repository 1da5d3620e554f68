//! Accept/reject policy for incoming offers.

use async_trait::async_trait;

use crate::types::TransferOffer;

/// Outcome of an offer decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Start receiving.
    Accept,
    /// Discard the offer and ignore its data.
    Reject,
}

/// Decides whether an incoming offer is accepted (UI or automated policy).
#[async_trait]
pub trait OfferDecider: Send + Sync + std::fmt::Debug + 'static {
    /// Decide on an offer.
    async fn decide(&self, offer: &TransferOffer) -> Decision;
}
