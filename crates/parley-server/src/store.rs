//! Message store adapter.
//!
//! The core talks to persistence only through [`MessageStore`], so the
//! dispatcher and the unseen counter can be exercised against in-memory
//! doubles. [`SqliteMessageStore`] is the production implementation on top of
//! `parley-store`.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use parley_shared::{MessageId, MessageRecord, NewMessage, UserId, UserProfile};
use parley_store::{Database, Result};

/// Database handle shared by every component of the server.
pub type SharedDatabase = Arc<Mutex<Database>>;

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a validated message as unseen.
    async fn create(
        &self,
        sender_id: UserId,
        receiver_id: UserId,
        message: &NewMessage,
    ) -> Result<MessageRecord>;

    /// Both directions between `viewer` and `peer`, oldest first, with every
    /// returned `peer -> viewer` message marked seen in the same step. A
    /// message stored concurrently is either returned or left unseen.
    async fn read_conversation(&self, viewer: UserId, peer: UserId) -> Result<Vec<MessageRecord>>;

    /// Mark every unseen `sender -> receiver` message as seen.
    async fn update_many_seen(&self, sender_id: UserId, receiver_id: UserId) -> Result<usize>;

    /// Mark one message addressed to `receiver_id` as seen; `false` when the
    /// id is unknown or addressed to someone else.
    async fn update_one_seen(&self, id: MessageId, receiver_id: UserId) -> Result<bool>;

    async fn count_unseen(&self, sender_id: UserId, receiver_id: UserId) -> Result<u32>;

    /// Every known user except `viewer`.
    async fn contacts(&self, viewer: UserId) -> Result<Vec<UserProfile>>;
}

#[derive(Clone)]
pub struct SqliteMessageStore {
    db: SharedDatabase,
}

impl SqliteMessageStore {
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    async fn create(
        &self,
        sender_id: UserId,
        receiver_id: UserId,
        message: &NewMessage,
    ) -> Result<MessageRecord> {
        let db = self.db.lock().await;
        let stored = db.insert_message(
            sender_id,
            receiver_id,
            message.text.as_deref(),
            message.image.as_deref(),
        )?;
        Ok(stored.into())
    }

    async fn read_conversation(
        &self,
        viewer: UserId,
        peer: UserId,
    ) -> Result<Vec<MessageRecord>> {
        let db = self.db.lock().await;
        let messages = db.read_conversation(viewer, peer)?;
        Ok(messages.into_iter().map(MessageRecord::from).collect())
    }

    async fn update_many_seen(&self, sender_id: UserId, receiver_id: UserId) -> Result<usize> {
        self.db
            .lock()
            .await
            .mark_conversation_seen(sender_id, receiver_id)
    }

    async fn update_one_seen(&self, id: MessageId, receiver_id: UserId) -> Result<bool> {
        self.db.lock().await.mark_message_seen(id, receiver_id)
    }

    async fn count_unseen(&self, sender_id: UserId, receiver_id: UserId) -> Result<u32> {
        self.db.lock().await.count_unseen(sender_id, receiver_id)
    }

    async fn contacts(&self, viewer: UserId) -> Result<Vec<UserProfile>> {
        let db = self.db.lock().await;
        let users = db.list_users_except(viewer)?;
        Ok(users.into_iter().map(UserProfile::from).collect())
    }
}
