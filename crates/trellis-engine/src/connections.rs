//! Connection request validation and the connection state machine.

use std::collections::{HashSet, VecDeque};

use tracing::{debug, info};

use trellis_shared::{ConnectionStatus, UserId};

use crate::error::{EngineError, Result};
use crate::store::{EdgeStore, UserDirectory};

/// Maximum shortest-path distance, in accepted-connection hops, at which a
/// new connection request is still allowed (friends-of-friends-of-friends).
pub const MAX_CONNECTION_DEPTH: u32 = 3;

/// Decides whether two users may form a direct connection and drives the
/// `Requested -> Accepted | Rejected` edge lifecycle.
pub struct ConnectionGraph<'a, E, D> {
    edges: &'a E,
    directory: &'a D,
}

impl<'a, E: EdgeStore, D: UserDirectory> ConnectionGraph<'a, E, D> {
    pub fn new(edges: &'a E, directory: &'a D) -> Self {
        Self { edges, directory }
    }

    /// Create a `Requested` edge from `actor` to `target`.
    ///
    /// An actor with no accepted connections may request anyone (a brand-new
    /// user must be able to make a first connection); otherwise `target`
    /// must lie within [`MAX_CONNECTION_DEPTH`] hops of `actor` in the
    /// accepted-connections graph.
    ///
    /// The eligibility read may race with concurrent writers; the store's
    /// uniqueness constraint on the unordered pair is the final arbiter, and
    /// a losing insert is re-classified from the winning edge.
    pub fn request_connection(&self, actor: &UserId, target: &UserId) -> Result<()> {
        if actor == target || !self.directory.exists(target)? {
            return Err(EngineError::InvalidTarget);
        }

        if let Some(edge) = self.edges.find_edge(actor, target)? {
            match edge.status {
                ConnectionStatus::Accepted => return Err(EngineError::AlreadyConnected),
                ConnectionStatus::Requested => return Err(EngineError::PendingRequest),
                // A rejected edge may be superseded by a fresh request.
                ConnectionStatus::Rejected => {}
            }
        }

        let accepted = self.edges.neighbors(actor, ConnectionStatus::Accepted)?;
        if !accepted.is_empty() && !self.within_reach(actor, target)? {
            return Err(EngineError::TooFarToConnect);
        }

        if !self
            .edges
            .insert_edge(actor, target, ConnectionStatus::Requested)?
        {
            // Lost a race against a concurrent request on the same pair.
            return match self.edges.find_edge(actor, target)? {
                Some(edge) if edge.status == ConnectionStatus::Accepted => {
                    Err(EngineError::AlreadyConnected)
                }
                _ => Err(EngineError::PendingRequest),
            };
        }

        info!(actor = %actor, target = %target, "connection requested");
        Ok(())
    }

    /// Accept or reject the pending request sent by `requester` to `actor`.
    ///
    /// Only the recipient of a request may respond, and a request may be
    /// resolved exactly once.
    pub fn respond_to_request(
        &self,
        actor: &UserId,
        requester: &UserId,
        accept: bool,
    ) -> Result<()> {
        let new_status = if accept {
            ConnectionStatus::Accepted
        } else {
            ConnectionStatus::Rejected
        };

        // Single compare-and-set: asserts `Requested` and writes the new
        // status in one store call, so a double-accept race cannot resolve
        // the same edge twice.
        if self
            .edges
            .update_status(requester, actor, ConnectionStatus::Requested, new_status)?
        {
            info!(actor = %actor, requester = %requester, status = %new_status, "request resolved");
            return Ok(());
        }

        match self.edges.find_edge(requester, actor)? {
            Some(edge)
                if edge.from == *requester && edge.status != ConnectionStatus::Requested =>
            {
                Err(EngineError::AlreadyResolved)
            }
            _ => Err(EngineError::NoSuchRequest(requester.clone())),
        }
    }

    /// Users with an accepted connection to `user`, both edge directions
    /// merged.  Order unspecified; callers sort if they need to.
    pub fn list_connections(&self, user: &UserId) -> Result<HashSet<UserId>> {
        Ok(self.edges.neighbors(user, ConnectionStatus::Accepted)?)
    }

    /// Users who have sent `user` a still-pending request, oldest first.
    /// Outgoing pending requests are not included.
    pub fn list_pending_requests(&self, user: &UserId) -> Result<Vec<UserId>> {
        let incoming = self.edges.incoming(user, ConnectionStatus::Requested)?;
        Ok(incoming.into_iter().map(|edge| edge.from).collect())
    }

    /// Bounded breadth-first search over accepted edges.
    ///
    /// Iterative with an explicit frontier and visited set, so it terminates
    /// on cyclic graphs and never recurses.  Nodes at the depth cap are not
    /// expanded, which bounds the search to `MAX_CONNECTION_DEPTH` hops.
    fn within_reach(&self, actor: &UserId, target: &UserId) -> Result<bool> {
        let mut visited: HashSet<UserId> = HashSet::new();
        let mut frontier: VecDeque<(UserId, u32)> = VecDeque::new();
        visited.insert(actor.clone());
        frontier.push_back((actor.clone(), 0));

        while let Some((user, depth)) = frontier.pop_front() {
            if depth == MAX_CONNECTION_DEPTH {
                continue;
            }
            for next in self.edges.neighbors(&user, ConnectionStatus::Accepted)? {
                if !visited.insert(next.clone()) {
                    continue;
                }
                if &next == target {
                    debug!(actor = %actor, target = %target, depth = depth + 1, "target reachable");
                    return Ok(true);
                }
                frontier.push_back((next, depth + 1));
            }
        }

        debug!(actor = %actor, target = %target, "target not reachable within bound");
        Ok(false)
    }
}
