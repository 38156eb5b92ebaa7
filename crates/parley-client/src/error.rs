use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Socket error: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Malformed payload: {0}")]
    Json(#[from] serde_json::Error),

    /// The server answered with `{"success": false, "message": ...}`.
    #[error("Server rejected request ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Not authorized")]
    Unauthorized,

    #[error("Not signed in")]
    NotSignedIn,

    #[error("No conversation selected")]
    NoConversation,
}

pub type Result<T> = std::result::Result<T, ClientError>;
