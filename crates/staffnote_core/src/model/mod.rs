//! Notation domain model shared by the ledger, session and persistence layers.
//!
//! # Responsibility
//! - Define note/rest entries, voice layers and composition records.
//! - Keep the serialized shape stable for saved composition files.
//!
//! # Invariants
//! - Note identity is caller-assigned and never reassigned.
//! - Each voice layer owns an independent ledger.

pub mod composition;
pub mod note;
pub mod voice;
