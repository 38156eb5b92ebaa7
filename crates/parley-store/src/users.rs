//! CRUD operations for [`User`] records.

use rusqlite::params;

use parley_shared::UserId;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{encode_timestamp, now, timestamp_col, uuid_col, User};

impl Database {
    /// Register a new user with a freshly generated id.
    pub fn create_user(
        &self,
        full_name: &str,
        bio: Option<&str>,
        profile_pic: Option<&str>,
    ) -> Result<User> {
        let user = User {
            id: UserId::new(),
            full_name: full_name.to_string(),
            bio: bio.map(str::to_string),
            profile_pic: profile_pic.map(str::to_string),
            created_at: now(),
        };

        self.conn().execute(
            "INSERT INTO users (id, full_name, bio, profile_pic, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.id.to_string(),
                user.full_name,
                user.bio,
                user.profile_pic,
                encode_timestamp(&user.created_at),
            ],
        )?;

        tracing::debug!(user = %user.id, "created user");
        Ok(user)
    }

    pub fn get_user(&self, id: UserId) -> Result<User> {
        self.conn()
            .query_row(
                "SELECT id, full_name, bio, profile_pic, created_at
                 FROM users WHERE id = ?1",
                params![id.to_string()],
                row_to_user,
            )
            .map_err(StoreError::from_query)
    }

    /// Every user except `id`, ordered by name.
    pub fn list_users_except(&self, id: UserId) -> Result<Vec<User>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, full_name, bio, profile_pic, created_at
             FROM users
             WHERE id != ?1
             ORDER BY full_name COLLATE NOCASE ASC, created_at ASC",
        )?;

        let rows = stmt.query_map(params![id.to_string()], row_to_user)?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }
}

pub(crate) fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId(uuid_col(row, 0)?),
        full_name: row.get(1)?,
        bio: row.get(2)?,
        profile_pic: row.get(3)?,
        created_at: timestamp_col(row, 4)?,
    })
}
