//! # parley-client
//!
//! Client library for a Parley server: the HTTP API, the live event stream
//! and the [`ChatSession`] that ties them together.
//!
//! A typical loop signs in, seeds the sidebar, then feeds every event from
//! the [`EventStream`] into [`ChatSession::apply_event`].

pub mod api;
pub mod error;
pub mod session;
pub mod socket;

pub use api::{ChatApi, HttpChatApi};
pub use error::{ClientError, Result};
pub use session::ChatSession;
pub use socket::EventStream;
