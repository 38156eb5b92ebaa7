//! v001 -- Initial schema creation.
//!
//! Creates the three core tables: `users`, `sessions` and `messages`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id          TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    full_name   TEXT NOT NULL,
    bio         TEXT,
    profile_pic TEXT,                        -- externally hosted URL
    created_at  TEXT NOT NULL                -- RFC-3339, microsecond precision
);

-- ----------------------------------------------------------------
-- Sessions
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS sessions (
    token_hash TEXT PRIMARY KEY NOT NULL,    -- hex BLAKE3 digest of the token
    user_id    TEXT NOT NULL,                -- FK -> users(id)
    created_at TEXT NOT NULL,

    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);

-- ----------------------------------------------------------------
-- Messages
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    seq         INTEGER PRIMARY KEY AUTOINCREMENT, -- insertion order, breaks timestamp ties
    id          TEXT UNIQUE NOT NULL,              -- UUID v4
    sender_id   TEXT NOT NULL,                     -- FK -> users(id)
    receiver_id TEXT NOT NULL,                     -- FK -> users(id)
    text        TEXT,
    image       TEXT,                              -- externally hosted URL
    created_at  TEXT NOT NULL,
    seen        INTEGER NOT NULL DEFAULT 0,        -- boolean 0/1, only ever set to 1

    FOREIGN KEY (sender_id)   REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (receiver_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_messages_pair
    ON messages(sender_id, receiver_id, created_at);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
