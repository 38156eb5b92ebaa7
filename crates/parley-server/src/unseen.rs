//! Server side of the unseen counter.
//!
//! Counts are always derived from the store; nothing is cached here.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tracing::debug;

use parley_shared::{MessageId, MessageRecord, UserId, UserProfile};

use crate::error::ServerError;
use crate::store::MessageStore;

/// Contacts for the sidebar plus the non-zero unseen counts per contact.
#[derive(Debug, Clone, PartialEq)]
pub struct Sidebar {
    pub users: Vec<UserProfile>,
    pub unseen: HashMap<UserId, u32>,
}

#[derive(Clone)]
pub struct UnseenCounter {
    store: Arc<dyn MessageStore>,
}

impl UnseenCounter {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self { store }
    }

    pub async fn fetch_sidebar(&self, viewer: UserId) -> Result<Sidebar, ServerError> {
        let users = self.store.contacts(viewer).await?;

        let counts = join_all(
            users
                .iter()
                .map(|user| self.store.count_unseen(user.id, viewer)),
        )
        .await;

        let mut unseen = HashMap::new();
        for (user, count) in users.iter().zip(counts) {
            let count = count?;
            if count > 0 {
                unseen.insert(user.id, count);
            }
        }

        Ok(Sidebar { users, unseen })
    }

    /// Load the conversation between `viewer` and `peer` and mark everything
    /// `peer` sent to `viewer` as seen. The returned records already reflect
    /// that update.
    pub async fn open_conversation(
        &self,
        viewer: UserId,
        peer: UserId,
    ) -> Result<Vec<MessageRecord>, ServerError> {
        let messages = self.store.read_conversation(viewer, peer).await?;
        debug!(viewer = %viewer, peer = %peer, count = messages.len(), "Conversation opened");
        Ok(messages)
    }

    /// Mark message `id` seen on behalf of `viewer`. Only the receiver can
    /// mark a message; unknown ids and other users' messages are a no-op.
    pub async fn mark_one_seen(&self, viewer: UserId, id: MessageId) -> Result<(), ServerError> {
        if !self.store.update_one_seen(id, viewer).await? {
            debug!(id = %id, viewer = %viewer, "Mark seen ignored");
        }
        Ok(())
    }

    pub async fn mark_all_seen(
        &self,
        viewer: UserId,
        sender: UserId,
    ) -> Result<usize, ServerError> {
        Ok(self.store.update_many_seen(sender, viewer).await?)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use parley_shared::{NewMessage, ServerEvent};

    use super::*;
    use crate::dispatcher::Dispatcher;
    use crate::presence::{ConnectionHandle, PresenceRegistry};
    use crate::store::memory::MemoryStore;

    fn setup() -> (Arc<MemoryStore>, UnseenCounter, UserId, UserId) {
        let store = Arc::new(MemoryStore::default());
        let alice = store.add_user("Alice");
        let bob = store.add_user("Bob");
        (store.clone(), UnseenCounter::new(store), alice, bob)
    }

    async fn send(store: &Arc<MemoryStore>, from: UserId, to: UserId, text: &str) -> MessageRecord {
        store.create(from, to, &NewMessage::text(text)).await.unwrap()
    }

    #[tokio::test]
    async fn sidebar_omits_zero_counts() {
        let (store, unseen, alice, bob) = setup();
        let carol = store.add_user("Carol");
        send(&store, alice, bob, "one").await;
        send(&store, alice, bob, "two").await;
        send(&store, bob, carol, "elsewhere").await;

        let sidebar = unseen.fetch_sidebar(bob).await.unwrap();

        assert_eq!(sidebar.users.len(), 2);
        assert!(sidebar.users.iter().all(|u| u.id != bob));
        assert_eq!(sidebar.unseen.get(&alice), Some(&2));
        assert!(!sidebar.unseen.contains_key(&carol));
    }

    #[tokio::test]
    async fn open_conversation_marks_peer_messages_seen() {
        let (store, unseen, alice, bob) = setup();
        send(&store, alice, bob, "hi bob").await;
        send(&store, bob, alice, "hi alice").await;
        send(&store, alice, bob, "still there?").await;

        let messages = unseen.open_conversation(bob, alice).await.unwrap();

        assert_eq!(messages.len(), 3);
        for m in &messages {
            assert_eq!(m.seen, m.sender_id == alice, "{:?}", m.text);
        }
        assert_eq!(store.count_unseen(alice, bob).await.unwrap(), 0);
        // Bob's own message to Alice is untouched.
        assert_eq!(store.count_unseen(bob, alice).await.unwrap(), 1);
        assert!(!unseen.fetch_sidebar(bob).await.unwrap().unseen.contains_key(&alice));
    }

    #[tokio::test]
    async fn mark_one_seen_is_idempotent() {
        let (store, unseen, alice, bob) = setup();
        let record = send(&store, alice, bob, "hello").await;

        unseen.mark_one_seen(bob, record.id).await.unwrap();
        let once = store.all();
        unseen.mark_one_seen(bob, record.id).await.unwrap();
        assert_eq!(store.all(), once);
        assert!(once[0].seen);

        unseen.mark_one_seen(bob, MessageId::new()).await.unwrap();
    }

    #[tokio::test]
    async fn only_the_receiver_marks_one_seen() {
        let (store, unseen, alice, bob) = setup();
        let carol = store.add_user("Carol");
        let record = send(&store, alice, bob, "for bob").await;

        unseen.mark_one_seen(alice, record.id).await.unwrap();
        unseen.mark_one_seen(carol, record.id).await.unwrap();

        assert!(!store.all()[0].seen);
        assert_eq!(unseen.fetch_sidebar(bob).await.unwrap().unseen.get(&alice), Some(&1));
    }

    /// Stores a message from `late_sender` right after each conversation read,
    /// the way a send racing an open would land.
    struct LateSend {
        inner: Arc<MemoryStore>,
        late_sender: UserId,
    }

    #[async_trait]
    impl MessageStore for LateSend {
        async fn create(
            &self,
            sender_id: UserId,
            receiver_id: UserId,
            message: &NewMessage,
        ) -> parley_store::Result<MessageRecord> {
            self.inner.create(sender_id, receiver_id, message).await
        }

        async fn read_conversation(
            &self,
            viewer: UserId,
            peer: UserId,
        ) -> parley_store::Result<Vec<MessageRecord>> {
            let history = self.inner.read_conversation(viewer, peer).await?;
            if peer == self.late_sender {
                self.inner
                    .create(peer, viewer, &NewMessage::text("late"))
                    .await?;
            }
            Ok(history)
        }

        async fn update_many_seen(
            &self,
            sender_id: UserId,
            receiver_id: UserId,
        ) -> parley_store::Result<usize> {
            self.inner.update_many_seen(sender_id, receiver_id).await
        }

        async fn update_one_seen(
            &self,
            id: MessageId,
            receiver_id: UserId,
        ) -> parley_store::Result<bool> {
            self.inner.update_one_seen(id, receiver_id).await
        }

        async fn count_unseen(
            &self,
            sender_id: UserId,
            receiver_id: UserId,
        ) -> parley_store::Result<u32> {
            self.inner.count_unseen(sender_id, receiver_id).await
        }

        async fn contacts(&self, viewer: UserId) -> parley_store::Result<Vec<UserProfile>> {
            self.inner.contacts(viewer).await
        }
    }

    #[tokio::test]
    async fn message_arriving_during_open_stays_unseen() {
        let inner = Arc::new(MemoryStore::default());
        let alice = inner.add_user("Alice");
        let bob = inner.add_user("Bob");
        let unseen = UnseenCounter::new(Arc::new(LateSend {
            inner: inner.clone(),
            late_sender: alice,
        }));
        send(&inner, alice, bob, "early").await;

        let history = unseen.open_conversation(bob, alice).await.unwrap();

        assert_eq!(history.len(), 1);
        assert!(history[0].seen);
        let late: Vec<_> = inner
            .all()
            .into_iter()
            .filter(|m| m.text.as_deref() == Some("late"))
            .collect();
        assert_eq!(late.len(), 1);
        assert!(!late[0].seen);
        assert_eq!(unseen.fetch_sidebar(bob).await.unwrap().unseen.get(&alice), Some(&1));
    }

    #[tokio::test]
    async fn mark_all_seen_targets_one_sender() {
        let (store, unseen, alice, bob) = setup();
        let carol = store.add_user("Carol");
        send(&store, alice, bob, "a").await;
        send(&store, carol, bob, "c").await;

        assert_eq!(unseen.mark_all_seen(bob, alice).await.unwrap(), 1);

        let sidebar = unseen.fetch_sidebar(bob).await.unwrap();
        assert_eq!(sidebar.unseen.len(), 1);
        assert_eq!(sidebar.unseen.get(&carol), Some(&1));
    }

    #[tokio::test]
    async fn store_failure_surfaces() {
        let (store, unseen, _alice, bob) = setup();
        store.fail();
        assert!(matches!(
            unseen.fetch_sidebar(bob).await,
            Err(ServerError::StoreUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn offline_delivery_end_to_end() {
        let (store, unseen, alice, bob) = setup();
        let presence = PresenceRegistry::new();
        let dispatcher = Dispatcher::new(store.clone(), presence.clone());
        let (alice_handle, mut alice_rx) = ConnectionHandle::new(8);
        presence.register(alice, alice_handle).await;

        // Bob is offline.
        let record = dispatcher
            .send(alice, bob, NewMessage::text("ping"))
            .await
            .unwrap();
        assert!(!record.seen);
        assert!(matches!(alice_rx.try_recv(), Ok(ServerEvent::NewMessage(_))));

        let sidebar = unseen.fetch_sidebar(bob).await.unwrap();
        assert!(sidebar.unseen.get(&alice).copied().unwrap_or(0) >= 1);

        let messages = unseen.open_conversation(bob, alice).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].seen);
        assert!(unseen.fetch_sidebar(bob).await.unwrap().unseen.is_empty());
    }
}
