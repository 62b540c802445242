//! # trellis-store
//!
//! SQLite persistence for the Trellis directory, backed by `rusqlite`.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for every domain
//! table.  `Database` also implements the `trellis-engine` storage traits
//! ([`EdgeStore`](trellis_engine::EdgeStore),
//! [`MessageStore`](trellis_engine::MessageStore),
//! [`UserDirectory`](trellis_engine::UserDirectory)), so the engines run
//! directly against it.

pub mod connections;
pub mod database;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod profiles;
pub mod users;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
