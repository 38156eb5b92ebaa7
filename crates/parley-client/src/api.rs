//! HTTP side of the client.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use parley_shared::constants::TOKEN_HEADER;
use parley_shared::protocol::{
    AckResponse, AuthCheckResponse, ConversationResponse, ErrorResponse, SendResponse,
    SidebarResponse,
};
use parley_shared::{MessageId, MessageRecord, NewMessage, UserId, UserProfile};

use crate::error::{ClientError, Result};

/// Requests the chat session issues against the server.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn check_auth(&self) -> Result<UserProfile>;

    async fn fetch_sidebar(&self) -> Result<SidebarResponse>;

    /// Load a conversation. The server marks the peer's messages seen.
    async fn fetch_conversation(&self, peer: UserId) -> Result<Vec<MessageRecord>>;

    async fn send(&self, receiver: UserId, message: &NewMessage) -> Result<MessageRecord>;

    async fn mark_one_seen(&self, id: MessageId) -> Result<()>;

    async fn mark_all_seen(&self, sender: UserId) -> Result<()>;
}

pub struct HttpChatApi {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpChatApi {
    /// `base_url` is the server root, e.g. `http://localhost:5000`.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthorized);
        }

        let bytes = resp.bytes().await?;
        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorResponse>(&bytes)
                .map(|e| e.message)
                .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).into_owned());
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn check_auth(&self) -> Result<UserProfile> {
        let resp = self
            .client
            .get(self.url("/api/auth/check"))
            .header(TOKEN_HEADER, &self.token)
            .send()
            .await?;
        let body: AuthCheckResponse = Self::decode(resp).await?;
        Ok(body.user)
    }

    async fn fetch_sidebar(&self) -> Result<SidebarResponse> {
        let resp = self
            .client
            .get(self.url("/api/messages/users"))
            .header(TOKEN_HEADER, &self.token)
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn fetch_conversation(&self, peer: UserId) -> Result<Vec<MessageRecord>> {
        let resp = self
            .client
            .get(self.url(&format!("/api/messages/{peer}")))
            .header(TOKEN_HEADER, &self.token)
            .send()
            .await?;
        let body: ConversationResponse = Self::decode(resp).await?;
        Ok(body.messages)
    }

    async fn send(&self, receiver: UserId, message: &NewMessage) -> Result<MessageRecord> {
        let resp = self
            .client
            .post(self.url(&format!("/api/messages/send/{receiver}")))
            .header(TOKEN_HEADER, &self.token)
            .json(message)
            .send()
            .await?;
        let body: SendResponse = Self::decode(resp).await?;
        Ok(body.new_message)
    }

    async fn mark_one_seen(&self, id: MessageId) -> Result<()> {
        let resp = self
            .client
            .put(self.url(&format!("/api/messages/mark/{id}")))
            .header(TOKEN_HEADER, &self.token)
            .send()
            .await?;
        let _: AckResponse = Self::decode(resp).await?;
        Ok(())
    }

    async fn mark_all_seen(&self, sender: UserId) -> Result<()> {
        let resp = self
            .client
            .put(self.url(&format!("/api/messages/mark-all/{sender}")))
            .header(TOKEN_HEADER, &self.token)
            .send()
            .await?;
        let _: AckResponse = Self::decode(resp).await?;
        Ok(())
    }
}
