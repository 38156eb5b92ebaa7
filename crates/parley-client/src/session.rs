//! Client chat session.
//!
//! Holds everything a signed-in client shows: the contact list, who is
//! online, the open conversation and the unseen counter per contact. The
//! counter is updated locally as events arrive and re-seeded wholesale on
//! every [`ChatSession::refresh_sidebar`].

use std::collections::HashMap;

use tracing::{debug, warn};

use parley_shared::{MessageRecord, NewMessage, ServerEvent, UserId, UserProfile};

use crate::api::ChatApi;
use crate::error::{ClientError, Result};

pub struct ChatSession<A: ChatApi> {
    api: A,
    me: Option<UserProfile>,
    users: Vec<UserProfile>,
    online: Vec<UserId>,
    selected: Option<UserId>,
    messages: Vec<MessageRecord>,
    unseen: HashMap<UserId, u32>,
}

impl<A: ChatApi> ChatSession<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            me: None,
            users: Vec::new(),
            online: Vec::new(),
            selected: None,
            messages: Vec::new(),
            unseen: HashMap::new(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn me(&self) -> Option<&UserProfile> {
        self.me.as_ref()
    }

    pub fn users(&self) -> &[UserProfile] {
        &self.users
    }

    pub fn online_users(&self) -> &[UserId] {
        &self.online
    }

    pub fn is_online(&self, user: UserId) -> bool {
        self.online.contains(&user)
    }

    pub fn selected(&self) -> Option<UserId> {
        self.selected
    }

    pub fn messages(&self) -> &[MessageRecord] {
        &self.messages
    }

    pub fn unseen(&self) -> &HashMap<UserId, u32> {
        &self.unseen
    }

    pub fn unseen_for(&self, peer: UserId) -> u32 {
        self.unseen.get(&peer).copied().unwrap_or(0)
    }

    /// Resolve the signed-in user. Clears the session if the token is rejected.
    pub async fn check_auth(&mut self) -> Result<&UserProfile> {
        match self.api.check_auth().await {
            Ok(user) => self.me = Some(user),
            Err(e) => {
                self.logout();
                return Err(e);
            }
        }
        self.me.as_ref().ok_or(ClientError::NotSignedIn)
    }

    /// Reload contacts and replace the unseen counters with the server's.
    pub async fn refresh_sidebar(&mut self) -> Result<()> {
        let sidebar = self.api.fetch_sidebar().await?;
        self.users = sidebar.users;
        self.unseen = sidebar.unseen_messages;
        Ok(())
    }

    /// Select `peer` and load the conversation with it.
    pub async fn open_conversation(&mut self, peer: UserId) -> Result<&[MessageRecord]> {
        let messages = self.api.fetch_conversation(peer).await?;
        self.selected = Some(peer);
        self.messages = messages;
        self.unseen.remove(&peer);
        Ok(&self.messages)
    }

    /// Deselect the open conversation. Unseen counters are left alone.
    pub fn close_conversation(&mut self) {
        self.selected = None;
        self.messages.clear();
    }

    /// Send to the selected contact and append the stored record.
    pub async fn send(&mut self, message: NewMessage) -> Result<MessageRecord> {
        let peer = self.selected.ok_or(ClientError::NoConversation)?;
        let record = self.api.send(peer, &message).await?;
        self.messages.push(record.clone());
        Ok(record)
    }

    pub async fn apply_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::OnlineUsers(online) => self.online = online,
            ServerEvent::NewMessage(record) => self.on_incoming_message(record).await,
        }
    }

    /// A message pushed by the server.
    ///
    /// Messages from the open conversation are shown and marked seen right
    /// away; anything else bumps the sender's unseen counter.
    pub async fn on_incoming_message(&mut self, mut record: MessageRecord) {
        let Some(me) = self.me.as_ref().map(|u| u.id) else {
            debug!(id = %record.id, "Ignoring message before sign-in");
            return;
        };
        if record.sender_id == me || record.receiver_id != me {
            return;
        }

        let sender = record.sender_id;
        if self.selected == Some(sender) {
            record.seen = true;
            let id = record.id;
            self.messages.push(record);
            self.unseen.remove(&sender);
            if let Err(e) = self.api.mark_one_seen(id).await {
                warn!(id = %id, error = %e, "Failed to mark message seen");
            }
        } else {
            *self.unseen.entry(sender).or_insert(0) += 1;
        }
    }

    /// Forget everything tied to the signed-in user.
    pub fn logout(&mut self) {
        self.close_conversation();
        self.me = None;
        self.users.clear();
        self.online.clear();
        self.unseen.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;
    use parley_shared::protocol::SidebarResponse;
    use parley_shared::MessageId;

    use super::*;

    #[derive(Default)]
    struct FakeApi {
        me: Option<UserProfile>,
        sidebar: Mutex<Option<SidebarResponse>>,
        conversation: Mutex<Vec<MessageRecord>>,
        marked: Mutex<Vec<MessageId>>,
    }

    #[async_trait]
    impl ChatApi for FakeApi {
        async fn check_auth(&self) -> Result<UserProfile> {
            self.me.clone().ok_or(ClientError::Unauthorized)
        }

        async fn fetch_sidebar(&self) -> Result<SidebarResponse> {
            self.sidebar
                .lock()
                .unwrap()
                .clone()
                .ok_or(ClientError::Unauthorized)
        }

        async fn fetch_conversation(&self, _peer: UserId) -> Result<Vec<MessageRecord>> {
            Ok(self.conversation.lock().unwrap().clone())
        }

        async fn send(&self, receiver: UserId, message: &NewMessage) -> Result<MessageRecord> {
            let me = self.me.as_ref().ok_or(ClientError::Unauthorized)?.id;
            Ok(record(me, receiver, message.text.as_deref().unwrap_or_default()))
        }

        async fn mark_one_seen(&self, id: MessageId) -> Result<()> {
            self.marked.lock().unwrap().push(id);
            Ok(())
        }

        async fn mark_all_seen(&self, _sender: UserId) -> Result<()> {
            Ok(())
        }
    }

    fn profile(name: &str) -> UserProfile {
        UserProfile {
            id: UserId::new(),
            full_name: name.to_string(),
            bio: None,
            profile_pic: None,
        }
    }

    fn record(from: UserId, to: UserId, text: &str) -> MessageRecord {
        MessageRecord {
            id: MessageId::new(),
            sender_id: from,
            receiver_id: to,
            text: Some(text.to_string()),
            image: None,
            created_at: Utc::now(),
            seen: false,
        }
    }

    async fn signed_in(me: &UserProfile) -> ChatSession<FakeApi> {
        let api = FakeApi {
            me: Some(me.clone()),
            ..Default::default()
        };
        let mut session = ChatSession::new(api);
        session.check_auth().await.unwrap();
        session
    }

    #[tokio::test]
    async fn incoming_from_other_contact_increments() {
        let (me, alice) = (profile("Me"), profile("Alice"));
        let mut session = signed_in(&me).await;

        session.on_incoming_message(record(alice.id, me.id, "1")).await;
        session.on_incoming_message(record(alice.id, me.id, "2")).await;

        assert_eq!(session.unseen_for(alice.id), 2);
        assert!(session.messages().is_empty());
    }

    #[tokio::test]
    async fn incoming_in_open_conversation_is_seen() {
        let (me, alice) = (profile("Me"), profile("Alice"));
        let mut session = signed_in(&me).await;
        session.open_conversation(alice.id).await.unwrap();

        let msg = record(alice.id, me.id, "hi");
        session.on_incoming_message(msg.clone()).await;

        assert_eq!(session.unseen_for(alice.id), 0);
        assert_eq!(session.messages().len(), 1);
        assert!(session.messages()[0].seen);
        assert_eq!(*session.api().marked.lock().unwrap(), vec![msg.id]);
    }

    #[tokio::test]
    async fn own_messages_are_ignored() {
        let (me, alice) = (profile("Me"), profile("Alice"));
        let mut session = signed_in(&me).await;
        session.open_conversation(alice.id).await.unwrap();

        session
            .apply_event(ServerEvent::NewMessage(record(me.id, alice.id, "echo")))
            .await;

        assert!(session.messages().is_empty());
        assert!(session.unseen().is_empty());
    }

    #[tokio::test]
    async fn opening_resets_counter_and_sidebar_reseeds() {
        let (me, alice, bob) = (profile("Me"), profile("Alice"), profile("Bob"));
        let mut session = signed_in(&me).await;
        *session.api().sidebar.lock().unwrap() = Some(SidebarResponse {
            success: true,
            users: vec![alice.clone(), bob.clone()],
            unseen_messages: HashMap::from([(alice.id, 3), (bob.id, 1)]),
        });

        session.refresh_sidebar().await.unwrap();
        assert_eq!(session.users().len(), 2);
        assert_eq!(session.unseen_for(alice.id), 3);

        session.open_conversation(alice.id).await.unwrap();
        assert_eq!(session.selected(), Some(alice.id));
        assert_eq!(session.unseen_for(alice.id), 0);
        assert_eq!(session.unseen_for(bob.id), 1);

        // Local drift is replaced by whatever the server reports.
        session.on_incoming_message(record(bob.id, me.id, "x")).await;
        assert_eq!(session.unseen_for(bob.id), 2);
        session.refresh_sidebar().await.unwrap();
        assert_eq!(session.unseen_for(bob.id), 1);
    }

    #[tokio::test]
    async fn send_requires_selection() {
        let (me, alice) = (profile("Me"), profile("Alice"));
        let mut session = signed_in(&me).await;

        assert!(matches!(
            session.send(NewMessage::text("hi")).await,
            Err(ClientError::NoConversation)
        ));

        session.open_conversation(alice.id).await.unwrap();
        let sent = session.send(NewMessage::text("hi")).await.unwrap();
        assert_eq!(sent.receiver_id, alice.id);
        assert_eq!(session.messages(), &[sent]);
    }

    #[tokio::test]
    async fn closed_conversation_counts_again() {
        let (me, alice) = (profile("Me"), profile("Alice"));
        let mut session = signed_in(&me).await;
        session.open_conversation(alice.id).await.unwrap();
        session.on_incoming_message(record(alice.id, me.id, "one")).await;
        assert_eq!(session.messages().len(), 1);

        session.close_conversation();
        assert!(session.selected().is_none());
        assert!(session.messages().is_empty());

        session.on_incoming_message(record(alice.id, me.id, "two")).await;
        assert_eq!(session.unseen_for(alice.id), 1);
        assert_eq!(session.api().marked.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn presence_and_logout() {
        let (me, alice) = (profile("Me"), profile("Alice"));
        let mut session = signed_in(&me).await;

        session
            .apply_event(ServerEvent::OnlineUsers(vec![me.id, alice.id]))
            .await;
        assert!(session.is_online(alice.id));

        session.open_conversation(alice.id).await.unwrap();
        session.on_incoming_message(record(alice.id, me.id, "hi")).await;
        session.logout();

        assert!(session.me().is_none());
        assert!(session.online_users().is_empty());
        assert!(session.selected().is_none());
        assert!(session.messages().is_empty());
        assert!(session.unseen().is_empty());
    }

    #[tokio::test]
    async fn rejected_token_clears_session() {
        let mut session = ChatSession::new(FakeApi::default());
        assert!(matches!(
            session.check_auth().await,
            Err(ClientError::Unauthorized)
        ));
        assert!(session.me().is_none());
    }
}
