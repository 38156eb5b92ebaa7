//! Live socket transport.
//!
//! One WebSocket per signed-in client. The socket is push-only: the server
//! writes `ServerEvent` frames and ignores whatever the client sends, apart
//! from noticing that the connection went away.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use parley_shared::{ConnectionState, UserId, ValidationError};

use crate::api::AppState;
use crate::error::ServerError;
use crate::lifecycle::ConnectionEvent;
use crate::presence::ConnectionHandle;

#[derive(Debug, Deserialize)]
pub struct SocketParams {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

impl SocketParams {
    /// The identity claimed by the handshake. It is not re-authenticated.
    fn claimed_user(&self) -> Result<UserId, ServerError> {
        let raw = self
            .user_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ServerError::BadRequest("Missing userId".to_string()))?;

        raw.parse()
            .map_err(|_| ValidationError::InvalidId(raw.to_string()).into())
    }
}

pub async fn socket_handler(
    State(state): State<AppState>,
    Query(params): Query<SocketParams>,
    ws: WebSocketUpgrade,
) -> Result<Response, ServerError> {
    let user_id = params.claimed_user()?;
    let lifecycle = state.lifecycle.clone();
    let capacity = state.config.outbound_queue;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, user_id, lifecycle, capacity)))
}

async fn handle_socket(
    socket: WebSocket,
    user_id: UserId,
    lifecycle: mpsc::Sender<ConnectionEvent>,
    capacity: usize,
) {
    let (handle, mut outbound) = ConnectionHandle::new(capacity);
    let connection_id = handle.id();
    debug!(
        user = %user_id,
        conn = %connection_id,
        state = ?ConnectionState::Connecting,
        "Socket upgraded"
    );

    // Held until the socket ends. If a newer connection replaces this one in
    // the registry, the queue stays open and this socket just goes quiet.
    let _own = handle.clone();

    if lifecycle
        .send(ConnectionEvent::Connected { user_id, handle })
        .await
        .is_err()
    {
        warn!(user = %user_id, "Lifecycle manager is gone, dropping socket");
        return;
    }
    debug!(
        user = %user_id,
        conn = %connection_id,
        state = ?ConnectionState::Open,
        "Socket open"
    );

    let (mut sink, mut stream) = socket.split();

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = outbound.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    warn!(event = event.name(), error = %e, "Failed to encode event");
                    continue;
                }
            };
            if sink.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(frame) = stream.next().await {
            match frame {
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    debug!(error = %e, "Socket read failed");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    debug!(
        user = %user_id,
        conn = %connection_id,
        state = ?ConnectionState::Closed,
        "Socket closed"
    );
    if lifecycle
        .send(ConnectionEvent::Disconnected {
            user_id,
            connection_id,
        })
        .await
        .is_err()
    {
        debug!(user = %user_id, "Lifecycle manager is gone, skipping disconnect");
    }
}
