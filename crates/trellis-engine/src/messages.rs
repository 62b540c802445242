//! Per-viewer message visibility and the two-party soft delete.
//!
//! A message is one shared record with two independent deletion flags, one
//! per participant.  Deleting as sender never hides the message from the
//! receiver, and vice versa; once both flags are set the row becomes
//! eligible for physical purge by a retention job outside this crate.

use chrono::Utc;
use tracing::info;

use trellis_shared::{DeliveryStatus, Message, MessageId, MessageRole, UserId};

use crate::error::{EngineError, Result};
use crate::store::{MessageStore, UserDirectory};

pub struct Mailbox<'a, M, D> {
    messages: &'a M,
    directory: &'a D,
}

impl<'a, M: MessageStore, D: UserDirectory> Mailbox<'a, M, D> {
    pub fn new(messages: &'a M, directory: &'a D) -> Self {
        Self { messages, directory }
    }

    /// Record a new message from `sender` to `receiver`.
    ///
    /// Messaging is deliberately not gated by the connection graph; any two
    /// directory users can exchange messages.
    pub fn send(
        &self,
        sender: &UserId,
        receiver: &UserId,
        contents: impl Into<String>,
    ) -> Result<MessageId> {
        for user in [sender, receiver] {
            if !self.directory.exists(user)? {
                return Err(EngineError::UnknownUser(user.clone()));
            }
        }

        let message = Message {
            id: MessageId::new(),
            sender: sender.clone(),
            receiver: receiver.clone(),
            contents: contents.into(),
            sent_at: Utc::now(),
            delivery_status: DeliveryStatus::Delivered,
            deleted_by_sender: false,
            deleted_by_receiver: false,
        };
        self.messages.insert_message(&message)?;

        info!(id = %message.id, sender = %sender, receiver = %receiver, "message sent");
        Ok(message.id)
    }

    /// Messages where `viewer` holds `role`, in send-time order, excluding
    /// those the viewer has soft-deleted.  The counterpart's flag is
    /// ignored: the two role views are independent projections over the
    /// same records.
    pub fn list_visible(&self, viewer: &UserId, role: MessageRole) -> Result<Vec<Message>> {
        let all = self.messages.list_by_role(viewer, role)?;
        Ok(all.into_iter().filter(|m| m.visible_to(role)).collect())
    }

    /// Soft-delete a message from `viewer`'s side.
    ///
    /// Sets exactly the flag owned by the viewer's role.  Deleting an
    /// already-deleted message succeeds without touching the store, so
    /// callers need not special-case repeats.
    pub fn delete(&self, viewer: &UserId, id: MessageId) -> Result<()> {
        let message = self
            .messages
            .get_message(id)?
            .ok_or(EngineError::NotParticipant)?;
        let role = message
            .role_of(viewer)
            .ok_or(EngineError::NotParticipant)?;

        if !message.visible_to(role) {
            return Ok(());
        }

        self.messages.set_deletion_flag(id, role)?;
        info!(id = %id, viewer = %viewer, ?role, "message soft-deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn mailbox(store: &MemoryStore) -> Mailbox<'_, MemoryStore, MemoryStore> {
        Mailbox::new(store, store)
    }

    #[test]
    fn send_requires_both_parties_to_exist() {
        let store = MemoryStore::with_users(&["alice"]);
        let mailbox = mailbox(&store);

        assert_eq!(
            mailbox.send(&"alice".into(), &"ghost".into(), "hello?"),
            Err(EngineError::UnknownUser(UserId::from("ghost")))
        );
        assert_eq!(
            mailbox.send(&"ghost".into(), &"alice".into(), "boo"),
            Err(EngineError::UnknownUser(UserId::from("ghost")))
        );
    }

    #[test]
    fn sent_and_received_views_line_up() {
        let store = MemoryStore::with_users(&["alice", "bob"]);
        let mailbox = mailbox(&store);

        let id = mailbox.send(&"alice".into(), &"bob".into(), "hi").unwrap();

        let sent = mailbox
            .list_visible(&"alice".into(), MessageRole::Sent)
            .unwrap();
        let received = mailbox
            .list_visible(&"bob".into(), MessageRole::Received)
            .unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(received.len(), 1);
        assert_eq!(sent[0].id, id);
        assert_eq!(received[0].id, id);
        assert_eq!(sent[0].contents, "hi");

        // No crossover into the other role's view.
        assert!(mailbox
            .list_visible(&"alice".into(), MessageRole::Received)
            .unwrap()
            .is_empty());
        assert!(mailbox
            .list_visible(&"bob".into(), MessageRole::Sent)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn messages_arrive_in_send_order() {
        let store = MemoryStore::with_users(&["alice", "bob"]);
        let mailbox = mailbox(&store);

        mailbox.send(&"alice".into(), &"bob".into(), "one").unwrap();
        mailbox.send(&"alice".into(), &"bob".into(), "two").unwrap();
        mailbox
            .send(&"alice".into(), &"bob".into(), "three")
            .unwrap();

        let received = mailbox
            .list_visible(&"bob".into(), MessageRole::Received)
            .unwrap();
        let contents: Vec<&str> = received.iter().map(|m| m.contents.as_str()).collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
    }

    #[test]
    fn deletes_by_each_party_are_independent() {
        let store = MemoryStore::with_users(&["alice", "bob"]);
        let mailbox = mailbox(&store);

        let id = mailbox.send(&"alice".into(), &"bob".into(), "hi").unwrap();

        mailbox.delete(&"alice".into(), id).unwrap();
        assert!(mailbox
            .list_visible(&"alice".into(), MessageRole::Sent)
            .unwrap()
            .is_empty());
        // Still visible to the receiver.
        assert_eq!(
            mailbox
                .list_visible(&"bob".into(), MessageRole::Received)
                .unwrap()
                .len(),
            1
        );

        mailbox.delete(&"bob".into(), id).unwrap();
        assert!(mailbox
            .list_visible(&"bob".into(), MessageRole::Received)
            .unwrap()
            .is_empty());

        let record = store.get_message(id).unwrap().unwrap();
        assert!(record.deleted_by_sender);
        assert!(record.deleted_by_receiver);
    }

    #[test]
    fn repeated_delete_is_idempotent() {
        let store = MemoryStore::with_users(&["alice", "bob"]);
        let mailbox = mailbox(&store);

        let id = mailbox.send(&"alice".into(), &"bob".into(), "hi").unwrap();
        mailbox.delete(&"alice".into(), id).unwrap();
        mailbox.delete(&"alice".into(), id).unwrap();

        let record = store.get_message(id).unwrap().unwrap();
        assert!(record.deleted_by_sender);
        assert!(!record.deleted_by_receiver);
    }

    #[test]
    fn outsiders_cannot_delete() {
        let store = MemoryStore::with_users(&["alice", "bob", "carol"]);
        let mailbox = mailbox(&store);

        let id = mailbox.send(&"alice".into(), &"bob".into(), "hi").unwrap();
        assert_eq!(
            mailbox.delete(&"carol".into(), id),
            Err(EngineError::NotParticipant)
        );
        assert_eq!(
            mailbox.delete(&"carol".into(), MessageId::new()),
            Err(EngineError::NotParticipant)
        );
    }
}
