//! Core domain logic for StaffNote, a music notation editor.
//! This crate is the single source of truth for notation invariants.

pub mod config;
pub mod db;
pub mod id;
pub mod ledger;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::CoreConfig;
pub use id::{IdSource, SequentialIdSource, UuidIdSource};
pub use ledger::{LedgerChange, NoteLedger, SubscriptionId};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::composition::{
    ChordSymbol, Clef, CompositionData, CompositionValidationError, EditorSelection,
    NoteWithVoiceInfo, LEGACY_VOICE_ID,
};
pub use model::note::{NoteEntry, NoteId, NoteKind, NoteValidationError, Position};
pub use model::voice::{VoiceLayer, DEFAULT_VOICE_COLOR, DEFAULT_VOICE_NAME};
pub use repo::composition_repo::{
    CompositionListQuery, CompositionRepository, CompositionSummary, RepoError, RepoResult,
    SqliteCompositionRepository,
};
pub use service::composition_service::{
    CompositionListResult, CompositionService, CompositionServiceError,
};
pub use service::session::{EditingSession, SessionError};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
