use rusqlite::params;

use parley_shared::{MessageId, UserId};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{encode_timestamp, now, timestamp_col, uuid_col, Message};

const MESSAGE_COLUMNS: &str =
    "seq, id, sender_id, receiver_id, text, image, created_at, seen";

impl Database {
    /// Persist a new, unseen message. The store assigns id, timestamp and
    /// insertion sequence.
    pub fn insert_message(
        &self,
        sender_id: UserId,
        receiver_id: UserId,
        text: Option<&str>,
        image: Option<&str>,
    ) -> Result<Message> {
        let id = MessageId::new();
        let created_at = now();

        self.conn()
            .execute(
                "INSERT INTO messages (id, sender_id, receiver_id, text, image, created_at, seen)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)",
                params![
                    id.to_string(),
                    sender_id.to_string(),
                    receiver_id.to_string(),
                    text,
                    image,
                    encode_timestamp(&created_at),
                ],
            )
            .map_err(StoreError::from_write)?;

        Ok(Message {
            seq: self.conn().last_insert_rowid(),
            id,
            sender_id,
            receiver_id,
            text: text.map(str::to_string),
            image: image.map(str::to_string),
            created_at,
            seen: false,
        })
    }

    pub fn get_message(&self, id: MessageId) -> Result<Message> {
        self.conn()
            .query_row(
                &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"),
                params![id.to_string()],
                row_to_message,
            )
            .map_err(StoreError::from_query)
    }

    /// Both directions of the conversation between `a` and `b`, oldest first.
    pub fn messages_between(&self, a: UserId, b: UserId) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {MESSAGE_COLUMNS}
             FROM messages
             WHERE (sender_id = ?1 AND receiver_id = ?2)
                OR (sender_id = ?2 AND receiver_id = ?1)
             ORDER BY created_at ASC, seq ASC"
        ))?;

        let rows = stmt.query_map(params![a.to_string(), b.to_string()], row_to_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    /// Mark every unseen `sender -> receiver` message as seen.
    /// Returns the number of messages that changed.
    pub fn mark_conversation_seen(&self, sender_id: UserId, receiver_id: UserId) -> Result<usize> {
        let affected = self.conn().execute(
            "UPDATE messages SET seen = 1
             WHERE sender_id = ?1 AND receiver_id = ?2 AND seen = 0",
            params![sender_id.to_string(), receiver_id.to_string()],
        )?;
        Ok(affected)
    }

    /// Load the conversation between `viewer` and `peer` and mark what `peer`
    /// sent to `viewer` as seen, in one transaction. Only rows that are part
    /// of the returned history are marked.
    pub fn read_conversation(&self, viewer: UserId, peer: UserId) -> Result<Vec<Message>> {
        let tx = self.conn().unchecked_transaction()?;
        let mut messages = self.messages_between(viewer, peer)?;
        let Some(last_seq) = messages.iter().map(|m| m.seq).max() else {
            return Ok(messages);
        };

        let marked = tx.execute(
            "UPDATE messages SET seen = 1
             WHERE sender_id = ?1 AND receiver_id = ?2 AND seen = 0 AND seq <= ?3",
            params![peer.to_string(), viewer.to_string(), last_seq],
        )?;
        tx.commit()?;

        for m in messages.iter_mut() {
            if m.sender_id == peer && m.receiver_id == viewer {
                m.seen = true;
            }
        }
        tracing::debug!(viewer = %viewer, peer = %peer, marked, "conversation read");
        Ok(messages)
    }

    /// Mark a single message addressed to `receiver_id` as seen. Idempotent;
    /// returns `false` when the id is unknown or the message belongs to
    /// another receiver.
    pub fn mark_message_seen(&self, id: MessageId, receiver_id: UserId) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE messages SET seen = 1 WHERE id = ?1 AND receiver_id = ?2",
            params![id.to_string(), receiver_id.to_string()],
        )?;
        Ok(affected > 0)
    }

    pub fn count_unseen(&self, sender_id: UserId, receiver_id: UserId) -> Result<u32> {
        let count: u32 = self.conn().query_row(
            "SELECT COUNT(*) FROM messages
             WHERE sender_id = ?1 AND receiver_id = ?2 AND seen = 0",
            params![sender_id.to_string(), receiver_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let seen: i64 = row.get(7)?;

    Ok(Message {
        seq: row.get(0)?,
        id: MessageId(uuid_col(row, 1)?),
        sender_id: UserId(uuid_col(row, 2)?),
        receiver_id: UserId(uuid_col(row, 3)?),
        text: row.get(4)?,
        image: row.get(5)?,
        created_at: timestamp_col(row, 6)?,
        seen: seen != 0,
    })
}
