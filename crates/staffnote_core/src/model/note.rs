//! Note/rest entry model.
//!
//! # Responsibility
//! - Define the record stored by a `NoteLedger`.
//! - Provide declaration-level validation used by persistence write paths.
//!
//! # Invariants
//! - `id` is caller-assigned and never reassigned.
//! - `pitch` is meaningful only when `kind == NoteKind::Note`.
//! - `position` is the horizontal ordering key; uniqueness is enforced by the
//!   owning ledger, not by this type.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static PITCH_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-G](?:##|#|bb|b)?[0-9]$").expect("valid pitch regex"));

/// Opaque identifier of one note/rest entry.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type NoteId = String;

/// Horizontal ordering key on the staff.
pub type Position = i64;

/// Entry category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    /// Pitched note.
    Note,
    /// Silence of the given duration.
    Rest,
}

impl NoteKind {
    /// Stable string form used in storage and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Rest => "rest",
        }
    }
}

/// One note or rest placed on a staff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteEntry {
    /// Caller-assigned unique id.
    pub id: NoteId,
    /// Serialized as `type` to match saved composition files.
    #[serde(rename = "type")]
    pub kind: NoteKind,
    /// Scientific pitch name such as `C4` or `F#5`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch: Option<String>,
    /// Duration token (`whole`, `half`, `quarter`, ...). Opaque to the ledger.
    pub duration: String,
    pub position: Position,
    /// Staff y-coordinate computed by the renderer.
    #[serde(default)]
    pub vertical_position: i32,
    #[serde(default)]
    pub dotted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lyric: Option<String>,
}

impl NoteEntry {
    /// Creates a pitched note.
    pub fn note(
        id: impl Into<NoteId>,
        pitch: impl Into<String>,
        duration: impl Into<String>,
        position: Position,
    ) -> Self {
        Self {
            id: id.into(),
            kind: NoteKind::Note,
            pitch: Some(pitch.into()),
            duration: duration.into(),
            position,
            vertical_position: 0,
            dotted: false,
            lyric: None,
        }
    }

    /// Creates a rest. Rests never carry a pitch.
    pub fn rest(id: impl Into<NoteId>, duration: impl Into<String>, position: Position) -> Self {
        Self {
            id: id.into(),
            kind: NoteKind::Rest,
            pitch: None,
            duration: duration.into(),
            position,
            vertical_position: 0,
            dotted: false,
            lyric: None,
        }
    }

    pub fn with_dotted(mut self, dotted: bool) -> Self {
        self.dotted = dotted;
        self
    }

    pub fn with_lyric(mut self, lyric: impl Into<String>) -> Self {
        self.lyric = Some(lyric.into());
        self
    }

    pub fn with_vertical_position(mut self, vertical_position: i32) -> Self {
        self.vertical_position = vertical_position;
        self
    }

    pub fn is_rest(&self) -> bool {
        self.kind == NoteKind::Rest
    }

    /// Validates declaration-level invariants.
    ///
    /// The ledger itself never calls this; persistence write paths do.
    pub fn validate(&self) -> Result<(), NoteValidationError> {
        if self.id.trim().is_empty() {
            return Err(NoteValidationError::EmptyId);
        }
        if self.duration.trim().is_empty() {
            return Err(NoteValidationError::EmptyDuration {
                id: self.id.clone(),
            });
        }

        match (self.kind, self.pitch.as_deref()) {
            (NoteKind::Rest, Some(_)) => Err(NoteValidationError::RestWithPitch {
                id: self.id.clone(),
            }),
            (NoteKind::Note, Some(pitch)) if !is_valid_pitch_name(pitch) => {
                Err(NoteValidationError::InvalidPitch {
                    id: self.id.clone(),
                    pitch: pitch.to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

/// Returns whether `value` is a scientific pitch name (`C4`, `F#5`, `Bb3`).
pub fn is_valid_pitch_name(value: &str) -> bool {
    PITCH_NAME_RE.is_match(value)
}

/// Note validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteValidationError {
    EmptyId,
    EmptyDuration { id: NoteId },
    RestWithPitch { id: NoteId },
    InvalidPitch { id: NoteId, pitch: String },
}

impl Display for NoteValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "note id must not be empty"),
            Self::EmptyDuration { id } => write!(f, "note `{id}` has an empty duration"),
            Self::RestWithPitch { id } => write!(f, "rest `{id}` must not carry a pitch"),
            Self::InvalidPitch { id, pitch } => {
                write!(f, "note `{id}` has invalid pitch `{pitch}`")
            }
        }
    }
}

impl Error for NoteValidationError {}
