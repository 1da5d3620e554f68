//! Offer decision policies.

use async_trait::async_trait;
use tracing::warn;

use filerelay_core::traits::{Decision, OfferDecider};
use filerelay_core::types::TransferOffer;

/// Accepts every offer.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoAccept;

#[async_trait]
impl OfferDecider for AutoAccept {
    async fn decide(&self, _offer: &TransferOffer) -> Decision {
        Decision::Accept
    }
}

/// Rejects every offer.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoReject;

#[async_trait]
impl OfferDecider for AutoReject {
    async fn decide(&self, _offer: &TransferOffer) -> Decision {
        Decision::Reject
    }
}

/// Asks on the terminal. Any prompt failure counts as a rejection.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptDecider;

#[async_trait]
impl OfferDecider for PromptDecider {
    async fn decide(&self, offer: &TransferOffer) -> Decision {
        let sender = offer
            .meta
            .sender
            .as_ref()
            .map(|s| s.name.clone())
            .unwrap_or_else(|| offer.from.to_string());
        let prompt = format!(
            "{} wants to send you '{}' ({} bytes, {}). Accept?",
            sender, offer.meta.name, offer.meta.size, offer.meta.mime_type
        );

        let answer = tokio::task::spawn_blocking(move || {
            dialoguer::Confirm::new()
                .with_prompt(prompt)
                .default(true)
                .interact()
        })
        .await;

        match answer {
            Ok(Ok(true)) => Decision::Accept,
            Ok(Ok(false)) => Decision::Reject,
            Ok(Err(e)) => {
                warn!(error = %e, "Prompt failed, rejecting offer");
                Decision::Reject
            }
            Err(e) => {
                warn!(error = %e, "Prompt task failed, rejecting offer");
                Decision::Reject
            }
        }
    }
}
