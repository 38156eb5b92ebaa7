//! Delivery dispatcher.
//!
//! Persists a new message and then pushes it to whichever of the two parties
//! currently has a live connection. Pushes are fire-and-forget: an offline or
//! slow recipient simply picks the message up on its next fetch.

use std::sync::Arc;

use tracing::{debug, info, warn};

use parley_shared::{MessageRecord, NewMessage, ServerEvent, UserId};

use crate::error::ServerError;
use crate::presence::PresenceRegistry;
use crate::store::MessageStore;

#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<dyn MessageStore>,
    presence: PresenceRegistry,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn MessageStore>, presence: PresenceRegistry) -> Self {
        Self { store, presence }
    }

    /// Validate, persist, then fan out `message` from `sender_id` to
    /// `receiver_id`. Nothing is pushed unless the message was stored.
    pub async fn send(
        &self,
        sender_id: UserId,
        receiver_id: UserId,
        message: NewMessage,
    ) -> Result<MessageRecord, ServerError> {
        let message = message.normalized()?;

        let record = self
            .store
            .create(sender_id, receiver_id, &message)
            .await
            .map_err(|e| {
                warn!(
                    sender = %sender_id,
                    receiver = %receiver_id,
                    error = %e,
                    "Failed to persist message"
                );
                ServerError::from(e)
            })?;

        let delivered = self.deliver(&record).await;
        info!(
            id = %record.id,
            sender = %sender_id,
            receiver = %receiver_id,
            delivered,
            "Message stored"
        );

        Ok(record)
    }

    /// Push `record` to the receiver and the sender. Returns the number of
    /// live connections that accepted it.
    async fn deliver(&self, record: &MessageRecord) -> usize {
        let mut targets = vec![record.receiver_id];
        if record.sender_id != record.receiver_id {
            targets.push(record.sender_id);
        }

        let mut delivered = 0;
        for user_id in targets {
            match self.presence.lookup(user_id).await {
                Some(handle) => {
                    if handle.push(ServerEvent::NewMessage(record.clone())) {
                        delivered += 1;
                    }
                }
                None => debug!(user = %user_id, id = %record.id, "Recipient offline"),
            }
        }
        delivered
    }
}
