//! Storage traits consumed by the engines.
//!
//! `trellis-store` implements all three for its SQLite `Database`; engine
//! unit tests use in-memory fakes.  Every method returns
//! [`StoreFault`](crate::StoreFault) on failure, which the engines surface
//! as the retryable `StoreUnavailable` outcome.

use std::collections::HashSet;

use trellis_shared::{ConnectionStatus, Edge, Message, MessageId, MessageRole, UserId};

use crate::error::StoreFault;

/// Durable table of connection edges.
pub trait EdgeStore {
    /// Look up the edge between two users, in either direction.
    ///
    /// When both a live (`Requested`/`Accepted`) edge and superseded
    /// `Rejected` edges exist, the live edge is returned.
    fn find_edge(&self, a: &UserId, b: &UserId) -> Result<Option<Edge>, StoreFault>;

    /// Insert a new edge.  Returns `false` when the store's uniqueness
    /// constraint on the unordered pair rejects the write (a live edge
    /// already exists) -- the final arbiter under concurrent requests.
    fn insert_edge(
        &self,
        from: &UserId,
        to: &UserId,
        status: ConnectionStatus,
    ) -> Result<bool, StoreFault>;

    /// Compare-and-set the status of the directed edge `from -> to`.
    /// Returns `false` when no edge with status `expected` exists.
    fn update_status(
        &self,
        from: &UserId,
        to: &UserId,
        expected: ConnectionStatus,
        new: ConnectionStatus,
    ) -> Result<bool, StoreFault>;

    /// All users joined to `user` by an edge with the given status,
    /// merging both edge directions.  This is the one-hop expansion
    /// primitive for the reachability search.
    fn neighbors(
        &self,
        user: &UserId,
        status: ConnectionStatus,
    ) -> Result<HashSet<UserId>, StoreFault>;

    /// Directed edges `* -> to` with the given status, oldest first.
    fn incoming(&self, to: &UserId, status: ConnectionStatus) -> Result<Vec<Edge>, StoreFault>;
}

/// Durable table of messages with the two-party soft-delete flags.
pub trait MessageStore {
    fn insert_message(&self, message: &Message) -> Result<(), StoreFault>;

    fn get_message(&self, id: MessageId) -> Result<Option<Message>, StoreFault>;

    /// Every message where `user` holds `role`, in send-time order.
    /// Deletion flags are not filtered here; visibility is the engine's job.
    fn list_by_role(&self, user: &UserId, role: MessageRole) -> Result<Vec<Message>, StoreFault>;

    /// Set the deletion flag owned by `role`.  Never touches the
    /// counterpart's flag.
    fn set_deletion_flag(&self, id: MessageId, role: MessageRole) -> Result<(), StoreFault>;
}

/// The external user directory.  Account data itself is not owned by the
/// engines; all they need is existence.
pub trait UserDirectory {
    fn exists(&self, user: &UserId) -> Result<bool, StoreFault>;
}
