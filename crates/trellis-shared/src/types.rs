use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// User identity = opaque directory login, e.g. "jdoe42"
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a connection edge.
///
/// `Requested` and `Rejected` edges are directional (only the recipient may
/// act on them); an `Accepted` edge is treated as undirected everywhere.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ConnectionStatus {
    Requested,
    Accepted,
    Rejected,
}

impl ConnectionStatus {
    /// Canonical TEXT form stored in SQLite.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Requested => "Requested",
            Self::Accepted => "Accepted",
            Self::Rejected => "Rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Requested" => Some(Self::Requested),
            "Accepted" => Some(Self::Accepted),
            "Rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed connection record between two users.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Edge {
    /// The user who initiated the request.
    pub from: UserId,
    /// The user on the receiving end.
    pub to: UserId,
    pub status: ConnectionStatus,
    /// When the request was created.
    pub requested_at: DateTime<Utc>,
}

impl Edge {
    /// Whether `user` is one of the edge's endpoints.
    pub fn touches(&self, user: &UserId) -> bool {
        &self.from == user || &self.to == user
    }

    /// The endpoint that is not `user`.  Returns `None` if `user` is not an
    /// endpoint at all.
    pub fn other(&self, user: &UserId) -> Option<&UserId> {
        if &self.from == user {
            Some(&self.to)
        } else if &self.to == user {
            Some(&self.from)
        } else {
            None
        }
    }
}

/// Which side of a message a user is acting as.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MessageRole {
    Sent,
    Received,
}

/// Delivery state reported by the transport.  Opaque to the visibility
/// engine; retained because the wire row carries it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DeliveryStatus {
    Delivered,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delivered => "Delivered",
            Self::Failed => "Failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Delivered" => Some(Self::Delivered),
            "Failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// A single directory message.
///
/// The visibility engine owns only the two deletion flags; every other field
/// is immutable payload written once at send time.  Both flags set means the
/// row is eligible for physical purge by a retention job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub sender: UserId,
    pub receiver: UserId,
    pub contents: String,
    pub sent_at: DateTime<Utc>,
    pub delivery_status: DeliveryStatus,
    /// Set when the sender soft-deletes; never cleared.
    pub deleted_by_sender: bool,
    /// Set when the receiver soft-deletes; never cleared.
    pub deleted_by_receiver: bool,
}

impl Message {
    /// The role `user` holds on this message, if any.
    pub fn role_of(&self, user: &UserId) -> Option<MessageRole> {
        if &self.sender == user {
            Some(MessageRole::Sent)
        } else if &self.receiver == user {
            Some(MessageRole::Received)
        } else {
            None
        }
    }

    /// Whether the message is still visible to the holder of `role`.
    pub fn visible_to(&self, role: MessageRole) -> bool {
        match role {
            MessageRole::Sent => !self.deleted_by_sender,
            MessageRole::Received => !self.deleted_by_receiver,
        }
    }
}
