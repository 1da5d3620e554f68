//! Presence registry: logical user id → live connection + cached profile.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use filerelay_core::error::AppError;
use filerelay_core::types::{ConnectionId, PublicProfile, UserId};

use crate::connection::handle::ConnectionHandle;

/// Ordered snapshot of the public profiles of all joined users.
pub type Roster = Vec<PublicProfile>;

/// One joined user.
#[derive(Debug, Clone)]
pub struct PresenceEntry {
    /// Logical user id.
    pub user_id: UserId,
    /// Connection the user is currently reachable on.
    pub connection: Arc<ConnectionHandle>,
    /// Cached public profile.
    pub profile: PublicProfile,
}

/// Registry of joined users.
///
/// Holds at most one entry per logical user and at most one logical user
/// per connection. The roster is returned in first-join order.
pub trait PresenceRegistry: Send + Sync + Debug + 'static {
    /// Bind `user_id` to `connection`, replacing any previous entry for the
    /// same user in place. Returns the roster after the change.
    fn join(
        &self,
        user_id: UserId,
        connection: Arc<ConnectionHandle>,
        profile: PublicProfile,
    ) -> Roster;

    /// Remove the entry bound to `conn_id`, if any. Returns the roster
    /// after the change.
    fn leave(&self, conn_id: &ConnectionId) -> Roster;

    /// Resolve a logical user to its live connection.
    fn lookup(&self, user_id: &UserId) -> Result<Arc<ConnectionHandle>, AppError>;

    /// Logical user currently bound to `conn_id`.
    fn user_for(&self, conn_id: &ConnectionId) -> Option<UserId>;

    /// Public profiles of all entries in insertion order.
    fn roster(&self) -> Roster;

    /// Number of joined users.
    fn len(&self) -> usize;

    /// Whether no user is joined.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry.
    fn clear(&self);
}

#[derive(Debug, Default)]
struct RegistryState {
    /// Users in first-join order.
    order: Vec<UserId>,
    entries: HashMap<UserId, PresenceEntry>,
    by_connection: HashMap<ConnectionId, UserId>,
}

impl RegistryState {
    fn remove_user(&mut self, user_id: &UserId) -> Option<PresenceEntry> {
        let entry = self.entries.remove(user_id)?;
        self.order.retain(|id| id != user_id);
        self.by_connection.remove(&entry.connection.id);
        Some(entry)
    }

    fn roster(&self) -> Roster {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id))
            .map(|entry| entry.profile.clone())
            .collect()
    }
}

/// In-memory registry guarded by a read/write lock.
#[derive(Debug, Default)]
pub struct MemoryPresenceRegistry {
    state: RwLock<RegistryState>,
}

impl MemoryPresenceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl PresenceRegistry for MemoryPresenceRegistry {
    fn join(
        &self,
        user_id: UserId,
        connection: Arc<ConnectionHandle>,
        profile: PublicProfile,
    ) -> Roster {
        let mut state = self.write();

        // A connection carries at most one logical user.
        if let Some(previous) = state.by_connection.get(&connection.id).cloned() {
            if previous != user_id {
                state.remove_user(&previous);
            }
        }

        let conn_id = connection.id;
        let entry = PresenceEntry {
            user_id: user_id.clone(),
            connection,
            profile,
        };

        match state.entries.insert(user_id.clone(), entry) {
            Some(replaced) => {
                if replaced.connection.id != conn_id {
                    state.by_connection.remove(&replaced.connection.id);
                }
            }
            None => state.order.push(user_id.clone()),
        }
        state.by_connection.insert(conn_id, user_id);

        state.roster()
    }

    fn leave(&self, conn_id: &ConnectionId) -> Roster {
        let mut state = self.write();
        if let Some(user_id) = state.by_connection.get(conn_id).cloned() {
            state.remove_user(&user_id);
        }
        state.roster()
    }

    fn lookup(&self, user_id: &UserId) -> Result<Arc<ConnectionHandle>, AppError> {
        self.read()
            .entries
            .get(user_id)
            .map(|entry| entry.connection.clone())
            .ok_or_else(|| AppError::not_found(format!("User '{user_id}' is not online")))
    }

    fn user_for(&self, conn_id: &ConnectionId) -> Option<UserId> {
        self.read().by_connection.get(conn_id).cloned()
    }

    fn roster(&self) -> Roster {
        self.read().roster()
    }

    fn len(&self) -> usize {
        self.read().entries.len()
    }

    fn clear(&self) {
        let mut state = self.write();
        state.order.clear();
        state.entries.clear();
        state.by_connection.clear();
    }
}
