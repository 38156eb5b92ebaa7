//! Live event stream from the server.

use futures::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use parley_shared::constants::{SOCKET_PATH, SOCKET_USER_PARAM};
use parley_shared::{ConnectionState, ServerEvent, UserId};

use crate::error::Result;

/// Socket URL for `user_id` on the server at `base_url` (`http` or `https`).
pub fn socket_url(base_url: &str, user_id: UserId) -> String {
    let base = base_url.trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!("{base}{SOCKET_PATH}?{SOCKET_USER_PARAM}={user_id}")
}

pub struct EventStream {
    inner: WebSocketStream<MaybeTlsStream<TcpStream>>,
    state: ConnectionState,
}

impl EventStream {
    pub async fn connect(base_url: &str, user_id: UserId) -> Result<Self> {
        let url = socket_url(base_url, user_id);
        debug!(url = %url, "Connecting event stream");
        let (inner, _) = connect_async(url.as_str()).await?;
        Ok(Self {
            inner,
            state: ConnectionState::Open,
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Next server event, or `None` once the socket is closed.
    /// Frames that do not decode as an event are skipped.
    pub async fn next_event(&mut self) -> Option<Result<ServerEvent>> {
        while let Some(frame) = self.inner.next().await {
            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => {
                    self.state = ConnectionState::Closed;
                    return Some(Err(e.into()));
                }
            };

            match frame {
                Message::Text(text) => match serde_json::from_str::<ServerEvent>(text.as_str()) {
                    Ok(event) => return Some(Ok(event)),
                    Err(e) => warn!(error = %e, "Skipping undecodable event"),
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
        self.state = ConnectionState::Closed;
        None
    }

    pub async fn close(mut self) -> Result<()> {
        self.state = ConnectionState::Closed;
        self.inner.close(None).await?;
        Ok(())
    }
}
