use rusqlite::Connection;

const UP_SQL: &str = r#"
-- Sidebar counts scan unseen messages per receiver
CREATE INDEX IF NOT EXISTS idx_messages_unseen
    ON messages(receiver_id, seen, sender_id);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
