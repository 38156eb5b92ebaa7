//! Presence registry.
//!
//! Maps each online user to the one connection currently registered for it.
//! A newer connection replaces the entry of an older one; removal is
//! compare-and-delete on the connection id so that a late disconnect of a
//! replaced connection never evicts its successor.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info};

use parley_shared::{ConnectionId, ServerEvent, UserId};

/// Sending side of one live socket.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    tx: mpsc::Sender<ServerEvent>,
}

impl ConnectionHandle {
    /// Create a handle with a bounded outbound queue. The receiver is drained
    /// by the socket writer.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ServerEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                id: ConnectionId::new(),
                tx,
            },
            rx,
        )
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue an event without waiting. Returns `false` when the queue is
    /// full or the socket is gone; the event is dropped in that case.
    pub fn push(&self, event: ServerEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(e) => {
                debug!(conn = %self.id, error = %e, "Dropping event for connection");
                false
            }
        }
    }
}

#[derive(Clone, Default)]
pub struct PresenceRegistry {
    entries: Arc<RwLock<HashMap<UserId, ConnectionHandle>>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handle` for `user_id`, returning the handle it replaced.
    pub async fn register(
        &self,
        user_id: UserId,
        handle: ConnectionHandle,
    ) -> Option<ConnectionHandle> {
        let conn = handle.id();
        let replaced = self.entries.write().await.insert(user_id, handle);

        match &replaced {
            Some(old) => info!(
                user = %user_id,
                conn = %conn,
                replaced = %old.id(),
                "User reconnected, replacing previous connection"
            ),
            None => info!(user = %user_id, conn = %conn, "User online"),
        }

        replaced
    }

    /// Remove the entry for `user_id` only if it still belongs to
    /// `connection_id`. Returns whether an entry was removed.
    pub async fn unregister(&self, user_id: UserId, connection_id: ConnectionId) -> bool {
        let mut entries = self.entries.write().await;
        match entries.get(&user_id) {
            Some(current) if current.id() == connection_id => {
                entries.remove(&user_id);
                info!(user = %user_id, conn = %connection_id, "User offline");
                true
            }
            Some(current) => {
                debug!(
                    user = %user_id,
                    stale = %connection_id,
                    current = %current.id(),
                    "Ignoring disconnect of replaced connection"
                );
                false
            }
            None => false,
        }
    }

    pub async fn lookup(&self, user_id: UserId) -> Option<ConnectionHandle> {
        self.entries.read().await.get(&user_id).cloned()
    }

    /// Every user with a registered connection, in a stable order.
    pub async fn all_active_user_ids(&self) -> Vec<UserId> {
        let mut ids: Vec<UserId> = self.entries.read().await.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Push `event` to every registered connection. Returns how many
    /// connections accepted it.
    pub async fn broadcast(&self, event: &ServerEvent) -> usize {
        // Snapshot under the lock, push outside it.
        let handles: Vec<ConnectionHandle> = self.entries.read().await.values().cloned().collect();

        handles
            .iter()
            .filter(|h| h.push(event.clone()))
            .count()
    }

    pub async fn online_count(&self) -> usize {
        self.entries.read().await.len()
    }
}
