// Types shared between the Parley server and its clients.

pub mod constants;
pub mod error;
pub mod protocol;
pub mod types;

pub use error::ValidationError;
pub use protocol::{MessageRecord, NewMessage, ServerEvent, UserProfile};
pub use types::{ConnectionId, ConnectionState, MessageId, UserId};
