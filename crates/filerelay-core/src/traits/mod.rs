//! Collaborator traits defined in `filerelay-core` and implemented by
//! other crates.

pub mod artifact;
pub mod authenticator;
pub mod decision;
pub mod transfer_log;

pub use artifact::ArtifactSink;
pub use authenticator::Authenticator;
pub use decision::{Decision, OfferDecider};
pub use transfer_log::TransferLog;
