//! In-memory fake of the storage traits, shared by the engine unit tests.

use std::cell::RefCell;
use std::collections::HashSet;

use chrono::Utc;

use trellis_shared::{ConnectionStatus, Edge, Message, MessageId, MessageRole, UserId};

use crate::error::StoreFault;
use crate::store::{EdgeStore, MessageStore, UserDirectory};

#[derive(Default)]
pub struct MemoryStore {
    users: RefCell<HashSet<UserId>>,
    edges: RefCell<Vec<Edge>>,
    messages: RefCell<Vec<Message>>,
    /// When set, the next `insert_edge` loses to this concurrent requester.
    lose_insert_to: RefCell<Option<UserId>>,
}

impl MemoryStore {
    pub fn with_users(ids: &[&str]) -> Self {
        let store = Self::default();
        store
            .users
            .borrow_mut()
            .extend(ids.iter().map(|id| UserId::from(*id)));
        store
    }

    /// Seed an already-accepted connection.
    pub fn accept(&self, a: &str, b: &str) {
        self.edges.borrow_mut().push(Edge {
            from: a.into(),
            to: b.into(),
            status: ConnectionStatus::Accepted,
            requested_at: Utc::now(),
        });
    }

    /// Make the next `insert_edge` behave as if `winner` created the
    /// reverse request first: the winning edge is recorded and the insert
    /// reports a uniqueness conflict.
    pub fn lose_next_insert_to(&self, winner: &str) {
        *self.lose_insert_to.borrow_mut() = Some(winner.into());
    }

    fn pair_matches(edge: &Edge, a: &UserId, b: &UserId) -> bool {
        (&edge.from == a && &edge.to == b) || (&edge.from == b && &edge.to == a)
    }

    fn live_edge_exists(&self, a: &UserId, b: &UserId) -> bool {
        self.edges
            .borrow()
            .iter()
            .any(|e| Self::pair_matches(e, a, b) && e.status != ConnectionStatus::Rejected)
    }
}

impl EdgeStore for MemoryStore {
    fn find_edge(&self, a: &UserId, b: &UserId) -> Result<Option<Edge>, StoreFault> {
        let edges = self.edges.borrow();
        let live = edges
            .iter()
            .find(|e| Self::pair_matches(e, a, b) && e.status != ConnectionStatus::Rejected);
        let any = edges
            .iter()
            .rev()
            .find(|e| Self::pair_matches(e, a, b));
        Ok(live.or(any).cloned())
    }

    fn insert_edge(
        &self,
        from: &UserId,
        to: &UserId,
        status: ConnectionStatus,
    ) -> Result<bool, StoreFault> {
        if let Some(winner) = self.lose_insert_to.borrow_mut().take() {
            self.edges.borrow_mut().push(Edge {
                from: winner,
                to: from.clone(),
                status: ConnectionStatus::Requested,
                requested_at: Utc::now(),
            });
            return Ok(false);
        }
        if self.live_edge_exists(from, to) {
            return Ok(false);
        }
        self.edges.borrow_mut().push(Edge {
            from: from.clone(),
            to: to.clone(),
            status,
            requested_at: Utc::now(),
        });
        Ok(true)
    }

    fn update_status(
        &self,
        from: &UserId,
        to: &UserId,
        expected: ConnectionStatus,
        new: ConnectionStatus,
    ) -> Result<bool, StoreFault> {
        let mut edges = self.edges.borrow_mut();
        for edge in edges.iter_mut() {
            if &edge.from == from && &edge.to == to && edge.status == expected {
                edge.status = new;
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn neighbors(
        &self,
        user: &UserId,
        status: ConnectionStatus,
    ) -> Result<HashSet<UserId>, StoreFault> {
        Ok(self
            .edges
            .borrow()
            .iter()
            .filter(|e| e.status == status)
            .filter_map(|e| e.other(user).cloned())
            .collect())
    }

    fn incoming(&self, to: &UserId, status: ConnectionStatus) -> Result<Vec<Edge>, StoreFault> {
        Ok(self
            .edges
            .borrow()
            .iter()
            .filter(|e| &e.to == to && e.status == status)
            .cloned()
            .collect())
    }
}

impl MessageStore for MemoryStore {
    fn insert_message(&self, message: &Message) -> Result<(), StoreFault> {
        self.messages.borrow_mut().push(message.clone());
        Ok(())
    }

    fn get_message(&self, id: MessageId) -> Result<Option<Message>, StoreFault> {
        Ok(self
            .messages
            .borrow()
            .iter()
            .find(|m| m.id == id)
            .cloned())
    }

    fn list_by_role(&self, user: &UserId, role: MessageRole) -> Result<Vec<Message>, StoreFault> {
        let mut matching: Vec<Message> = self
            .messages
            .borrow()
            .iter()
            .filter(|m| m.role_of(user) == Some(role))
            .cloned()
            .collect();
        matching.sort_by_key(|m| m.sent_at);
        Ok(matching)
    }

    fn set_deletion_flag(&self, id: MessageId, role: MessageRole) -> Result<(), StoreFault> {
        let mut messages = self.messages.borrow_mut();
        let message = messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| StoreFault("message vanished".into()))?;
        match role {
            MessageRole::Sent => message.deleted_by_sender = true,
            MessageRole::Received => message.deleted_by_receiver = true,
        }
        Ok(())
    }
}

impl UserDirectory for MemoryStore {
    fn exists(&self, user: &UserId) -> Result<bool, StoreFault> {
        Ok(self.users.borrow().contains(user))
    }
}
