//! Account service: resolves a session token to the user it belongs to.
//!
//! Signup, login and password handling live outside this server; they share
//! the database and hand out tokens through `Database::create_session`.

use async_trait::async_trait;
use tracing::debug;

use parley_shared::UserProfile;
use parley_store::StoreError;

use crate::error::ServerError;
use crate::store::SharedDatabase;

#[async_trait]
pub trait AccountService: Send + Sync {
    async fn authenticate(&self, token: &str) -> Result<UserProfile, ServerError>;
}

pub struct StoreAccountService {
    db: SharedDatabase,
}

impl StoreAccountService {
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccountService for StoreAccountService {
    async fn authenticate(&self, token: &str) -> Result<UserProfile, ServerError> {
        if token.trim().is_empty() {
            return Err(ServerError::Unauthorized);
        }

        match self.db.lock().await.user_for_token(token) {
            Ok(user) => Ok(user.into()),
            Err(StoreError::NotFound) => {
                debug!("Rejected unknown session token");
                Err(ServerError::Unauthorized)
            }
            Err(e) => Err(e.into()),
        }
    }
}
