/// Application name
pub const APP_NAME: &str = "Parley";

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 5000;

/// Maximum text length of a single message in bytes (64 KiB)
pub const MAX_MESSAGE_LEN: usize = 65_536;

/// Maximum request body size in bytes (4 MiB)
pub const MAX_BODY_SIZE: usize = 4 * 1024 * 1024;

/// Path of the live socket endpoint
pub const SOCKET_PATH: &str = "/socket";

/// Handshake query parameter carrying the claimed user id
pub const SOCKET_USER_PARAM: &str = "userId";

/// Request header carrying the session token
pub const TOKEN_HEADER: &str = "token";
