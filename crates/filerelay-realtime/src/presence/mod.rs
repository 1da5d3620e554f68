//! Presence registry: which logical users currently have a live connection.

pub mod registry;

pub use registry::{MemoryPresenceRegistry, PresenceEntry, PresenceRegistry, Roster};
