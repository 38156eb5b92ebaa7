//! # parley-store
//!
//! Durable storage for the Parley chat server, backed by SQLite.
//!
//! The crate exposes a synchronous `Database` handle that wraps a
//! `rusqlite::Connection` and provides typed helpers for users, sessions and
//! direct messages. The store is the single source of truth for the `seen`
//! flag of every message.

pub mod database;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod sessions;
pub mod users;

mod error;

pub use database::Database;
pub use error::{Result, StoreError};
pub use models::*;
