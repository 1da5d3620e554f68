//! Open sender → receiver streams, tracked between offer and complete/abort.

use std::collections::HashSet;

use dashmap::DashMap;

use filerelay_core::types::UserId;

/// Streams that have been offered but not yet completed or aborted.
#[derive(Debug, Default)]
pub struct ActiveStreams {
    /// Sender → receivers with an open stream.
    by_sender: DashMap<UserId, HashSet<UserId>>,
}

impl ActiveStreams {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a stream from `from` to `to` as open.
    pub fn open(&self, from: &UserId, to: &UserId) {
        self.by_sender
            .entry(from.clone())
            .or_default()
            .insert(to.clone());
    }

    /// Mark the stream from `from` to `to` as finished.
    pub fn close(&self, from: &UserId, to: &UserId) {
        let now_empty = match self.by_sender.get_mut(from) {
            Some(mut receivers) => {
                receivers.remove(to);
                receivers.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.by_sender.remove_if(from, |_, receivers| receivers.is_empty());
        }
    }

    /// Remove and return every receiver `from` was streaming to.
    pub fn take_sender(&self, from: &UserId) -> Vec<UserId> {
        let mut receivers: Vec<UserId> = self
            .by_sender
            .remove(from)
            .map(|(_, receivers)| receivers.into_iter().collect())
            .unwrap_or_default();
        receivers.sort();
        receivers
    }

    /// Forget every stream addressed to `to`.
    pub fn forget_receiver(&self, to: &UserId) {
        self.by_sender.retain(|_, receivers| {
            receivers.remove(to);
            !receivers.is_empty()
        });
    }

    /// Whether a stream from `from` to `to` is open.
    pub fn is_open(&self, from: &UserId, to: &UserId) -> bool {
        self.by_sender
            .get(from)
            .map(|receivers| receivers.contains(to))
            .unwrap_or(false)
    }

    /// Number of open streams.
    pub fn len(&self) -> usize {
        self.by_sender.iter().map(|entry| entry.value().len()).sum()
    }

    /// Whether no stream is open.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all streams.
    pub fn clear(&self) {
        self.by_sender.clear();
    }
}
