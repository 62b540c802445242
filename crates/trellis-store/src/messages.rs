//! CRUD operations for message records, plus the
//! [`MessageStore`](trellis_engine::MessageStore) impl the visibility
//! engine runs against.
//!
//! Deletion is always soft: the two flag columns are set-only and owned by
//! different parties, and rows are never removed here.  A retention job may
//! purge rows where both flags are set; that lives outside this crate.

use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use trellis_engine::{MessageStore, StoreFault};
use trellis_shared::{DeliveryStatus, Message, MessageId, MessageRole, UserId};

use crate::database::Database;
use crate::error::{Result, StoreError};

impl Database {
    pub fn insert_message(&self, message: &Message) -> Result<()> {
        self.conn().execute(
            "INSERT INTO messages (id, sender_id, receiver_id, contents, sent_at,
                                   delivery_status, deleted_by_sender, deleted_by_receiver)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                message.id.to_string(),
                message.sender.as_str(),
                message.receiver.as_str(),
                message.contents,
                message.sent_at.to_rfc3339(),
                message.delivery_status.as_str(),
                message.deleted_by_sender,
                message.deleted_by_receiver,
            ],
        )?;
        Ok(())
    }

    pub fn get_message(&self, id: MessageId) -> Result<Message> {
        self.conn()
            .query_row(
                "SELECT id, sender_id, receiver_id, contents, sent_at,
                        delivery_status, deleted_by_sender, deleted_by_receiver
                 FROM messages WHERE id = ?1",
                params![id.to_string()],
                row_to_message,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::from(other),
            })
    }

    /// Every message where `user` holds `role`, in send-time order.  The
    /// deletion flags are returned as stored; visibility filtering is the
    /// engine's job.
    pub fn list_messages_by_role(&self, user: &UserId, role: MessageRole) -> Result<Vec<Message>> {
        let column = role_column_for_party(role);
        let sql = format!(
            "SELECT id, sender_id, receiver_id, contents, sent_at,
                    delivery_status, deleted_by_sender, deleted_by_receiver
             FROM messages
             WHERE {column} = ?1
             ORDER BY sent_at ASC, id ASC"
        );
        let mut stmt = self.conn().prepare(&sql)?;

        let rows = stmt.query_map(params![user.as_str()], row_to_message)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::from)
    }

    /// Set the deletion flag owned by `role`.  A single-column update; the
    /// counterpart's flag is never touched.
    pub fn set_message_deletion_flag(&self, id: MessageId, role: MessageRole) -> Result<()> {
        let column = match role {
            MessageRole::Sent => "deleted_by_sender",
            MessageRole::Received => "deleted_by_receiver",
        };
        let sql = format!("UPDATE messages SET {column} = 1 WHERE id = ?1");
        let affected = self.conn().execute(&sql, params![id.to_string()])?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

impl MessageStore for Database {
    fn insert_message(&self, message: &Message) -> std::result::Result<(), StoreFault> {
        Database::insert_message(self, message).map_err(Into::into)
    }

    fn get_message(&self, id: MessageId) -> std::result::Result<Option<Message>, StoreFault> {
        match Database::get_message(self, id) {
            Ok(message) => Ok(Some(message)),
            Err(StoreError::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list_by_role(
        &self,
        user: &UserId,
        role: MessageRole,
    ) -> std::result::Result<Vec<Message>, StoreFault> {
        self.list_messages_by_role(user, role).map_err(Into::into)
    }

    fn set_deletion_flag(
        &self,
        id: MessageId,
        role: MessageRole,
    ) -> std::result::Result<(), StoreFault> {
        self.set_message_deletion_flag(id, role).map_err(Into::into)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// The party column a role keys on.
fn role_column_for_party(role: MessageRole) -> &'static str {
    match role {
        MessageRole::Sent => "sender_id",
        MessageRole::Received => "receiver_id",
    }
}

/// Map a `rusqlite::Row` to a [`Message`].
fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let id_str: String = row.get(0)?;
    let sender: String = row.get(1)?;
    let receiver: String = row.get(2)?;
    let contents: String = row.get(3)?;
    let sent_str: String = row.get(4)?;
    let delivery_str: String = row.get(5)?;
    let deleted_by_sender: bool = row.get(6)?;
    let deleted_by_receiver: bool = row.get(7)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let sent_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&sent_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;

    let delivery_status = DeliveryStatus::from_str(&delivery_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            rusqlite::types::Type::Text,
            format!("unknown delivery status '{delivery_str}'").into(),
        )
    })?;

    Ok(Message {
        id: MessageId(id),
        sender: UserId(sender),
        receiver: UserId(receiver),
        contents,
        sent_at,
        delivery_status,
        deleted_by_sender,
        deleted_by_receiver,
    })
}
