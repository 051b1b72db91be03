//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the broadcast storage contract used by services and queries.
//! - Isolate SQLite query details from orchestration code.
//!
//! # Invariants
//! - Repository writes enforce `Broadcast::validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod broadcast_repo;
