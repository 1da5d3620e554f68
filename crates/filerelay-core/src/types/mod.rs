//! Core type definitions used across the FileRelay workspace.

pub mod id;
pub mod profile;
pub mod transfer;

pub use id::*;
pub use profile::{PublicProfile, VerifiedIdentity};
pub use transfer::{
    Artifact, OfferMeta, SenderSummary, TransferOffer, TransferRecord, TransferStatus,
};
