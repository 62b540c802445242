//! Connection-gated profile visibility.
//!
//! The birth date is the only gated profile field; name, work history and
//! education are visible to any authenticated viewer.

use trellis_shared::{ConnectionStatus, UserId};

use crate::error::Result;
use crate::store::EdgeStore;

pub struct ProfileGate<'a, E> {
    edges: &'a E,
}

impl<'a, E: EdgeStore> ProfileGate<'a, E> {
    pub fn new(edges: &'a E) -> Self {
        Self { edges }
    }

    /// True iff `viewer` is `owner` or the two share an accepted
    /// connection, regardless of who requested it.
    pub fn can_view_birth_date(&self, viewer: &UserId, owner: &UserId) -> Result<bool> {
        if viewer == owner {
            return Ok(true);
        }
        Ok(matches!(
            self.edges.find_edge(viewer, owner)?,
            Some(edge) if edge.status == ConnectionStatus::Accepted
        ))
    }
}
