//! Voice layer model.
//!
//! Every voice layer owns an independent `NoteLedger`, so position
//! uniqueness holds per voice and two voices may share a position.

use crate::ledger::NoteLedger;
use serde::{Deserialize, Serialize};

/// Default playback volume for new voices (0-100 scale).
pub const DEFAULT_VOICE_VOLUME: u8 = 100;
/// Upper bound of the volume scale.
pub const MAX_VOICE_VOLUME: u8 = 100;
/// Name given to a composition's first voice.
pub const DEFAULT_VOICE_NAME: &str = "Voice 1";
/// Color given to a composition's first voice.
pub const DEFAULT_VOICE_COLOR: &str = "#000000";

/// One independently editable voice of a composition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceLayer {
    pub id: String,
    pub name: String,
    /// CSS-style color used to tint this voice's notes.
    pub color: String,
    pub visible: bool,
    /// Receives new notes from the editing session.
    pub active: bool,
    pub selected: bool,
    pub volume: u8,
    #[serde(default)]
    pub notes: NoteLedger,
}

impl VoiceLayer {
    /// Creates a visible, inactive, empty voice.
    pub fn new(id: impl Into<String>, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: color.into(),
            visible: true,
            active: false,
            selected: false,
            volume: DEFAULT_VOICE_VOLUME,
            notes: NoteLedger::new(),
        }
    }
}
