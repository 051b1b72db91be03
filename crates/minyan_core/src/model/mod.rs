//! Domain model for minyan broadcasts.
//!
//! # Responsibility
//! - Define the plain broadcast record and its creation/patch inputs.
//! - Own the pure validation rules every write path must pass.
//!
//! # Invariants
//! - Every broadcast is identified by a stable `BroadcastId`.
//! - Records carry no persistence behavior; storage lives in `repo`.
//! - Deletion is a hard delete; there is no tombstone state.

pub mod broadcast;
pub mod timestamp;
pub mod validate;
