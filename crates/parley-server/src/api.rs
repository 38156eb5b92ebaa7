use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, FromRequestParts, Path, State},
    http::{header, request::Parts, Method},
    routing::{get, post, put},
    Json, Router,
};
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use parley_shared::constants::{APP_NAME, SOCKET_PATH, TOKEN_HEADER};
use parley_shared::protocol::{
    AckResponse, AuthCheckResponse, ConversationResponse, SendResponse, SidebarResponse,
    StatusResponse,
};
use parley_shared::{MessageId, NewMessage, UserId, UserProfile, ValidationError};

use crate::accounts::{AccountService, StoreAccountService};
use crate::config::ServerConfig;
use crate::dispatcher::Dispatcher;
use crate::error::ServerError;
use crate::lifecycle::ConnectionEvent;
use crate::presence::PresenceRegistry;
use crate::store::{MessageStore, SharedDatabase, SqliteMessageStore};
use crate::unseen::UnseenCounter;
use crate::ws;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub accounts: Arc<dyn AccountService>,
    pub dispatcher: Dispatcher,
    pub unseen: UnseenCounter,
    pub presence: PresenceRegistry,
    pub lifecycle: mpsc::Sender<ConnectionEvent>,
}

impl AppState {
    /// Wire every component to one shared database.
    pub fn new(
        config: ServerConfig,
        db: SharedDatabase,
        presence: PresenceRegistry,
        lifecycle: mpsc::Sender<ConnectionEvent>,
    ) -> Self {
        let store: Arc<dyn MessageStore> = Arc::new(SqliteMessageStore::new(db.clone()));
        Self {
            config: Arc::new(config),
            accounts: Arc::new(StoreAccountService::new(db)),
            dispatcher: Dispatcher::new(store.clone(), presence.clone()),
            unseen: UnseenCounter::new(store),
            presence,
            lifecycle,
        }
    }
}

/// The caller, resolved from the `token` header or an
/// `Authorization: Bearer` header.
#[derive(Debug, Clone)]
pub struct AuthUser(pub UserProfile);

impl AuthUser {
    pub fn id(&self) -> UserId {
        self.0.id
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = request_token(parts).ok_or(ServerError::Unauthorized)?;
        let user = state.accounts.authenticate(token).await?;
        Ok(AuthUser(user))
    }
}

fn request_token(parts: &Parts) -> Option<&str> {
    if let Some(token) = parts
        .headers
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        return Some(token);
    }

    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
}

pub fn build_router(state: AppState) -> Router {
    let cors = if state.config.cors_any {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    Router::new()
        .route("/api/status", get(status))
        .route("/api/auth/check", get(auth_check))
        .route("/api/messages/users", get(sidebar))
        .route("/api/messages/{peer_id}", get(conversation))
        .route("/api/messages/send/{receiver_id}", post(send_message))
        .route("/api/messages/mark/{message_id}", put(mark_one))
        .route("/api/messages/mark-all/{sender_id}", put(mark_all))
        .route(SOCKET_PATH, get(ws::socket_handler))
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn parse_id<T: FromStr>(raw: &str) -> Result<T, ServerError> {
    raw.parse()
        .map_err(|_| ValidationError::InvalidId(raw.to_string()).into())
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        success: true,
        name: APP_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        online: state.presence.online_count().await,
    })
}

async fn auth_check(AuthUser(user): AuthUser) -> Json<AuthCheckResponse> {
    Json(AuthCheckResponse {
        success: true,
        user,
    })
}

async fn sidebar(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<SidebarResponse>, ServerError> {
    let sidebar = state.unseen.fetch_sidebar(user.id()).await?;
    Ok(Json(SidebarResponse {
        success: true,
        users: sidebar.users,
        unseen_messages: sidebar.unseen,
    }))
}

async fn conversation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(peer_id): Path<String>,
) -> Result<Json<ConversationResponse>, ServerError> {
    let peer: UserId = parse_id(&peer_id)?;
    let messages = state.unseen.open_conversation(user.id(), peer).await?;
    Ok(Json(ConversationResponse {
        success: true,
        messages,
    }))
}

async fn send_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path(receiver_id): Path<String>,
    Json(body): Json<NewMessage>,
) -> Result<Json<SendResponse>, ServerError> {
    let receiver: UserId = parse_id(&receiver_id)?;
    let record = state.dispatcher.send(user.id(), receiver, body).await?;
    Ok(Json(SendResponse {
        success: true,
        new_message: record,
    }))
}

/// Mark one message seen. Only its receiver can flip the flag; any other
/// caller gets the same acknowledgement with nothing changed.
async fn mark_one(
    State(state): State<AppState>,
    user: AuthUser,
    Path(message_id): Path<String>,
) -> Result<Json<AckResponse>, ServerError> {
    let id: MessageId = parse_id(&message_id)?;
    state.unseen.mark_one_seen(user.id(), id).await?;
    Ok(Json(AckResponse::ok()))
}

async fn mark_all(
    State(state): State<AppState>,
    user: AuthUser,
    Path(sender_id): Path<String>,
) -> Result<Json<AckResponse>, ServerError> {
    let sender: UserId = parse_id(&sender_id)?;
    state.unseen.mark_all_seen(user.id(), sender).await?;
    Ok(Json(AckResponse::ok()))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
