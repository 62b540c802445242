//! # trellis-shared
//!
//! Identifier newtypes and domain records shared by the Trellis engine and
//! store crates.  Everything here derives `Serialize`/`Deserialize` so it can
//! be handed directly to a UI layer over IPC.

pub mod types;

pub use types::*;
