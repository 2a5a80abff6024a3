//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate ledger edits into editing-session use-cases.
//! - Orchestrate repository calls into composition persistence use-cases.
//! - Keep UI layers decoupled from storage details.

pub mod composition_service;
pub mod session;
