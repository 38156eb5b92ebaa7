//! Session tokens.
//!
//! Tokens are 32 random bytes handed to the client as hex. Only the BLAKE3
//! digest of a token is stored.

use rand::RngCore;
use rusqlite::params;

use parley_shared::UserId;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{encode_timestamp, now, User};
use crate::users::row_to_user;

fn token_digest(token: &str) -> String {
    blake3::hash(token.trim().as_bytes()).to_hex().to_string()
}

impl Database {
    /// Open a new session for `user_id` and return the plaintext token.
    pub fn create_session(&self, user_id: UserId) -> Result<String> {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = hex::encode(bytes);

        self.conn()
            .execute(
                "INSERT INTO sessions (token_hash, user_id, created_at) VALUES (?1, ?2, ?3)",
                params![
                    token_digest(&token),
                    user_id.to_string(),
                    encode_timestamp(&now()),
                ],
            )
            .map_err(StoreError::from_write)?;

        Ok(token)
    }

    /// Resolve a plaintext token to its user.
    pub fn user_for_token(&self, token: &str) -> Result<User> {
        self.conn()
            .query_row(
                "SELECT u.id, u.full_name, u.bio, u.profile_pic, u.created_at
                 FROM sessions s JOIN users u ON u.id = s.user_id
                 WHERE s.token_hash = ?1",
                params![token_digest(token)],
                row_to_user,
            )
            .map_err(StoreError::from_query)
    }

    /// Invalidate a token. Returns `false` if it was not known.
    pub fn delete_session(&self, token: &str) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM sessions WHERE token_hash = ?1",
            params![token_digest(token)],
        )?;
        Ok(affected > 0)
    }
}
