//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate validation and repository calls into use-case level APIs.
//! - Keep wire/CLI layers decoupled from storage details.

pub mod broadcast_service;
