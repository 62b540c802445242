use thiserror::Error;

use trellis_shared::UserId;

/// Failure reported by a storage collaborator (timeout, lost connection,
/// corrupt row).  The engines surface every fault as
/// [`EngineError::StoreUnavailable`], the only retryable outcome.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct StoreFault(pub String);

/// Caller-visible outcomes of the engines.
///
/// All variants except `StoreUnavailable` are terminal for the current
/// request and should be shown to the end user as-is.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Target of a connection request is the actor themself or unknown.
    #[error("Invalid connection target")]
    InvalidTarget,

    /// An accepted connection already exists between the pair.
    #[error("Users are already connected")]
    AlreadyConnected,

    /// A request between the pair is already awaiting a response.
    #[error("A connection request is already pending")]
    PendingRequest,

    /// Target is more than the maximum hop count away in the
    /// accepted-connections graph.
    #[error("Target is too far away to connect")]
    TooFarToConnect,

    /// No pending request from the named user.
    #[error("No pending request from {0}")]
    NoSuchRequest(UserId),

    /// The request was already accepted or rejected.
    #[error("Request already resolved")]
    AlreadyResolved,

    /// A message party is not in the user directory.
    #[error("Unknown user: {0}")]
    UnknownUser(UserId),

    /// The acting user is neither sender nor receiver of the message.
    #[error("Not a participant in this message")]
    NotParticipant,

    /// Storage collaborator failed; the caller may retry.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StoreFault),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EngineError>;
