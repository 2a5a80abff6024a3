//! Identifier sources for notes, voices and compositions.
//!
//! # Responsibility
//! - Supply fresh ids to the editing session on request.
//! - Keep id generation injectable so sessions stay deterministic in tests.
//!
//! # Invariants
//! - `UuidIdSource` ids are UUID v4 text with negligible collision odds.
//! - `SequentialIdSource` ids are unique per source instance only.

use uuid::Uuid;

/// Capability that hands out new unique ids.
pub trait IdSource {
    fn next_id(&mut self) -> String;
}

impl<F> IdSource for F
where
    F: FnMut() -> String,
{
    fn next_id(&mut self) -> String {
        self()
    }
}

/// Random UUID v4 ids. Default for interactive sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdSource;

impl IdSource for UuidIdSource {
    fn next_id(&mut self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Deterministic `{prefix}-{n}` ids counting up from zero.
#[derive(Debug, Clone)]
pub struct SequentialIdSource {
    prefix: String,
    next: u64,
}

impl SequentialIdSource {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 0,
        }
    }
}

impl IdSource for SequentialIdSource {
    fn next_id(&mut self) -> String {
        let id = format!("{}-{}", self.prefix, self.next);
        self.next += 1;
        id
    }
}
