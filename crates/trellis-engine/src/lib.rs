//! # trellis-engine
//!
//! The two decision engines at the heart of the Trellis directory:
//!
//! - [`ConnectionGraph`] validates and mutates connection requests, including
//!   the bounded-depth reachability check over the accepted-connections graph.
//! - [`Mailbox`] computes per-viewer message visibility and applies the
//!   independent sender/receiver soft-delete flags.
//!
//! Both engines are stateless between calls and take the acting user as an
//! explicit argument.  Storage is reached through the narrow traits in
//! [`store`], so the engines can be exercised against in-memory fakes in
//! tests and against the SQLite-backed `trellis-store` in production.

pub mod connections;
pub mod error;
pub mod messages;
pub mod profile;
pub mod store;

#[cfg(test)]
mod memory;

pub use connections::{ConnectionGraph, MAX_CONNECTION_DEPTH};
pub use error::{EngineError, StoreFault};
pub use messages::Mailbox;
pub use profile::ProfileGate;
pub use store::{EdgeStore, MessageStore, UserDirectory};
