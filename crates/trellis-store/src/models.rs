//! Domain model structs persisted in the local SQLite database.
//!
//! The connection-edge and message records live in `trellis-shared`
//! ([`Edge`](trellis_shared::Edge), [`Message`](trellis_shared::Message));
//! this module holds the collaborator tables the engines only consult
//! through the directory trait.  Every struct derives `Serialize` and
//! `Deserialize` so it can be handed directly to a UI layer over IPC.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use trellis_shared::UserId;

// ---------------------------------------------------------------------------
// User account
// ---------------------------------------------------------------------------

/// A directory account.  Password material stays inside the store and is
/// never part of this struct.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserAccount {
    pub user_id: UserId,
    pub email: String,
    /// Optional full display name, used for directory search.
    pub name: Option<String>,
    /// Only shown to the owner and their accepted connections.
    pub date_of_birth: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// Directory search hit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSummary {
    pub user_id: UserId,
    pub name: Option<String>,
    pub email: String,
}

// ---------------------------------------------------------------------------
// Work experience
// ---------------------------------------------------------------------------

/// One employment entry on a profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkExperience {
    /// Row id assigned by SQLite.
    pub id: i64,
    pub user_id: UserId,
    pub company: String,
    pub role: String,
    pub location: Option<String>,
    pub start_date: NaiveDate,
    /// `None` while the position is current.
    pub end_date: Option<NaiveDate>,
}

/// Insert payload for a work-experience entry; the row id is assigned by
/// the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewWorkExperience {
    pub user_id: UserId,
    pub company: String,
    pub role: String,
    pub location: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// Education
// ---------------------------------------------------------------------------

/// One education entry on a profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Education {
    /// Row id assigned by SQLite.
    pub id: i64,
    pub user_id: UserId,
    pub institution: String,
    pub major: String,
    pub degree: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

/// Insert payload for an education entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewEducation {
    pub user_id: UserId,
    pub institution: String,
    pub major: String,
    pub degree: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// Profile view
// ---------------------------------------------------------------------------

/// A profile as assembled for a particular viewer.  The birth date is
/// present only when the viewer passed the connection gate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileView {
    pub user_id: UserId,
    pub name: Option<String>,
    pub email: String,
    pub date_of_birth: Option<NaiveDate>,
    pub work: Vec<WorkExperience>,
    pub education: Vec<Education>,
}
