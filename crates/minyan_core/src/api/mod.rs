//! Caller-facing request/response surface.
//!
//! # Responsibility
//! - Speak the public JSON contract without binding to an HTTP framework.
//! - Expose create/nearby as function-calling tools.

pub mod broadcast_api;
pub mod tools;
