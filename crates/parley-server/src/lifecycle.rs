//! Connection lifecycle.
//!
//! Sockets report `Connected` / `Disconnected` events over a channel. A single
//! manager task applies them to the presence registry in arrival order and
//! re-broadcasts the online user list after each one.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use parley_shared::{ConnectionId, ServerEvent, UserId};

use crate::presence::{ConnectionHandle, PresenceRegistry};

#[derive(Debug)]
pub enum ConnectionEvent {
    Connected {
        user_id: UserId,
        handle: ConnectionHandle,
    },
    Disconnected {
        user_id: UserId,
        connection_id: ConnectionId,
    },
}

pub struct LifecycleManager {
    presence: PresenceRegistry,
}

impl LifecycleManager {
    pub fn new(presence: PresenceRegistry) -> Self {
        Self { presence }
    }

    /// Spawn the manager task. The task ends once every sender is dropped.
    pub fn spawn(
        presence: PresenceRegistry,
        capacity: usize,
    ) -> (mpsc::Sender<ConnectionEvent>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let manager = Self::new(presence);
        let task = tokio::spawn(manager.run(rx));
        (tx, task)
    }

    pub async fn run(self, mut events: mpsc::Receiver<ConnectionEvent>) {
        info!("Connection lifecycle manager started");
        while let Some(event) = events.recv().await {
            self.apply(event).await;
        }
        info!("Connection lifecycle manager stopped");
    }

    pub async fn apply(&self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Connected { user_id, handle } => {
                self.presence.register(user_id, handle).await;
            }
            ConnectionEvent::Disconnected {
                user_id,
                connection_id,
            } => {
                self.presence.unregister(user_id, connection_id).await;
            }
        }
        self.broadcast_presence().await;
    }

    async fn broadcast_presence(&self) {
        let online = self.presence.all_active_user_ids().await;
        let count = online.len();
        let reached = self.presence.broadcast(&ServerEvent::OnlineUsers(online)).await;
        debug!(online = count, reached, "Broadcast online users");
    }
}
