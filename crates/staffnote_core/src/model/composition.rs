//! Composition record and its satellite types.
//!
//! # Responsibility
//! - Define the persisted shape of one composition (voices, chords, tempo,
//!   key, saved UI selection).
//! - Provide voice lookup helpers and a flattened note projection.
//!
//! # Invariants
//! - Voice ids are unique inside one composition.
//! - `active_voice_id`, when set, names an existing voice.
//! - Notes live only inside voice ledgers; `notes()` is derived, never stored.

use crate::model::note::{NoteEntry, NoteKind, NoteValidationError, Position};
use crate::model::voice::{
    VoiceLayer, DEFAULT_VOICE_COLOR, DEFAULT_VOICE_NAME, MAX_VOICE_VOLUME,
};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Tempo assigned to new compositions, in beats per minute.
pub const DEFAULT_TEMPO_BPM: u32 = 120;
pub const MIN_TEMPO_BPM: u32 = 1;
pub const MAX_TEMPO_BPM: u32 = 400;
/// Voice id given to notes lifted from a legacy flat `notes` list.
pub const LEGACY_VOICE_ID: &str = "voice-legacy";

const CLEF_NAMES: &[&str] = &["treble", "bass"];

const TREBLE_REFERENCE_SCALE: [&str; 20] = [
    "A5", "G5", "F5", "E5", "D5", "C5", "B4", "A4", "G4", "F4", "E4", "D4", "C4", "B3", "A3", "G3",
    "F3", "E3", "D3", "C3",
];
const BASS_REFERENCE_SCALE: [&str; 20] = [
    "C4", "B3", "A3", "G3", "F3", "E3", "D3", "C3", "B2", "A2", "G2", "F2", "E2", "D2", "C2", "B1",
    "A1", "G1", "F1", "E1",
];

/// Staff clef.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Clef {
    #[default]
    Treble,
    Bass,
}

impl Clef {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Treble => "treble",
            Self::Bass => "bass",
        }
    }

    /// Parses a clef name, ignoring case and surrounding whitespace.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "treble" => Some(Self::Treble),
            "bass" => Some(Self::Bass),
            _ => None,
        }
    }

    /// Every staff line and space this clef displays, top to bottom.
    pub fn reference_scale(self) -> &'static [&'static str] {
        match self {
            Self::Treble => &TREBLE_REFERENCE_SCALE,
            Self::Bass => &BASS_REFERENCE_SCALE,
        }
    }
}

impl<'de> Deserialize<'de> for Clef {
    /// Accepts any casing and surrounding whitespace, like [`Clef::parse`].
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).ok_or_else(|| de::Error::unknown_variant(&raw, CLEF_NAMES))
    }
}

/// Palette state saved alongside a composition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorSelection {
    pub selected_duration: String,
    pub selected_note_type: NoteKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_accidental: Option<String>,
    pub selected_octave: u8,
    pub is_dotted_note: bool,
}

impl Default for EditorSelection {
    fn default() -> Self {
        Self {
            selected_duration: "quarter".to_string(),
            selected_note_type: NoteKind::Note,
            selected_accidental: None,
            selected_octave: 4,
            is_dotted_note: false,
        }
    }
}

/// Chord name drawn above the staff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChordSymbol {
    pub id: String,
    pub position: Position,
    pub chord_name: String,
    pub top: i32,
}

/// Note projection carrying the owning voice, used by flattened views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteWithVoiceInfo {
    #[serde(flatten)]
    pub note: NoteEntry,
    pub voice_id: String,
    pub voice_color: String,
}

/// One saved composition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "CompositionDocument")]
pub struct CompositionData {
    pub id: String,
    pub name: String,
    /// Unix epoch milliseconds.
    pub date_created: i64,
    pub tempo: u32,
    pub clef: Clef,
    pub key_signature: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_signature: Option<String>,
    pub voice_layers: Vec<VoiceLayer>,
    pub chord_symbols: Vec<ChordSymbol>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_voice_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staff_width: Option<u32>,
    #[serde(flatten)]
    pub selection: EditorSelection,
}

/// Decoding shape for saved compositions.
///
/// Older files keep every note in a flat top-level `notes` list and have no
/// `voiceLayers`; those notes are lifted into one default voice.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompositionDocument {
    id: String,
    name: String,
    date_created: i64,
    tempo: u32,
    clef: Clef,
    key_signature: String,
    #[serde(default)]
    time_signature: Option<String>,
    #[serde(default)]
    voice_layers: Vec<VoiceLayer>,
    #[serde(default)]
    chord_symbols: Vec<ChordSymbol>,
    #[serde(default)]
    active_voice_id: Option<String>,
    #[serde(default)]
    staff_width: Option<u32>,
    #[serde(default)]
    notes: Vec<NoteEntry>,
    #[serde(flatten)]
    selection: EditorSelection,
}

impl From<CompositionDocument> for CompositionData {
    fn from(document: CompositionDocument) -> Self {
        let mut voice_layers = document.voice_layers;
        let mut active_voice_id = document.active_voice_id;

        if voice_layers.is_empty() && !document.notes.is_empty() {
            let mut voice =
                VoiceLayer::new(LEGACY_VOICE_ID, DEFAULT_VOICE_NAME, DEFAULT_VOICE_COLOR);
            voice.active = true;
            voice.notes.extend(document.notes);
            voice_layers.push(voice);
            active_voice_id = Some(LEGACY_VOICE_ID.to_string());
        }

        Self {
            id: document.id,
            name: document.name,
            date_created: document.date_created,
            tempo: document.tempo,
            clef: document.clef,
            key_signature: document.key_signature,
            time_signature: document.time_signature,
            voice_layers,
            chord_symbols: document.chord_symbols,
            active_voice_id,
            staff_width: document.staff_width,
            selection: document.selection,
        }
    }
}

impl CompositionData {
    /// Creates an empty composition in 4/4, C major, treble clef.
    pub fn new(id: impl Into<String>, name: impl Into<String>, date_created: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            date_created,
            tempo: DEFAULT_TEMPO_BPM,
            clef: Clef::Treble,
            key_signature: "C".to_string(),
            time_signature: Some("4/4".to_string()),
            voice_layers: Vec::new(),
            chord_symbols: Vec::new(),
            active_voice_id: None,
            staff_width: None,
            selection: EditorSelection::default(),
        }
    }

    pub fn voice(&self, voice_id: &str) -> Option<&VoiceLayer> {
        self.voice_layers.iter().find(|voice| voice.id == voice_id)
    }

    pub fn voice_mut(&mut self, voice_id: &str) -> Option<&mut VoiceLayer> {
        self.voice_layers
            .iter_mut()
            .find(|voice| voice.id == voice_id)
    }

    pub fn active_voice(&self) -> Option<&VoiceLayer> {
        let voice_id = self.active_voice_id.as_deref()?;
        self.voice(voice_id)
    }

    pub fn active_voice_mut(&mut self) -> Option<&mut VoiceLayer> {
        let voice_id = self.active_voice_id.clone()?;
        self.voice_mut(&voice_id)
    }

    /// Total number of entries across all voices.
    pub fn note_count(&self) -> usize {
        self.voice_layers.iter().map(|voice| voice.notes.len()).sum()
    }

    /// All notes of all voices, in voice order then ledger order.
    pub fn notes(&self) -> Vec<NoteWithVoiceInfo> {
        self.voice_layers
            .iter()
            .flat_map(|voice| {
                voice.notes.iter().map(move |note| NoteWithVoiceInfo {
                    note: note.clone(),
                    voice_id: voice.id.clone(),
                    voice_color: voice.color.clone(),
                })
            })
            .collect()
    }

    /// Validates composition-level invariants, including every note.
    pub fn validate(&self) -> Result<(), CompositionValidationError> {
        if self.id.trim().is_empty() {
            return Err(CompositionValidationError::EmptyId);
        }
        if self.name.trim().is_empty() {
            return Err(CompositionValidationError::EmptyName);
        }
        if !(MIN_TEMPO_BPM..=MAX_TEMPO_BPM).contains(&self.tempo) {
            return Err(CompositionValidationError::TempoOutOfRange(self.tempo));
        }

        let mut voice_ids = BTreeSet::new();
        for voice in &self.voice_layers {
            if voice.id.trim().is_empty() {
                return Err(CompositionValidationError::EmptyVoiceId);
            }
            if !voice_ids.insert(voice.id.as_str()) {
                return Err(CompositionValidationError::DuplicateVoiceId(
                    voice.id.clone(),
                ));
            }
            if voice.volume > MAX_VOICE_VOLUME {
                return Err(CompositionValidationError::VolumeOutOfRange {
                    voice_id: voice.id.clone(),
                    volume: voice.volume,
                });
            }
            for note in voice.notes.iter() {
                note.validate()
                    .map_err(|source| CompositionValidationError::Note {
                        voice_id: voice.id.clone(),
                        source,
                    })?;
            }
        }

        if let Some(active) = self.active_voice_id.as_deref() {
            if !voice_ids.contains(active) {
                return Err(CompositionValidationError::UnknownActiveVoice(
                    active.to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Composition validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompositionValidationError {
    EmptyId,
    EmptyName,
    TempoOutOfRange(u32),
    EmptyVoiceId,
    DuplicateVoiceId(String),
    VolumeOutOfRange {
        voice_id: String,
        volume: u8,
    },
    UnknownActiveVoice(String),
    Note {
        voice_id: String,
        source: NoteValidationError,
    },
}

impl Display for CompositionValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "composition id must not be empty"),
            Self::EmptyName => write!(f, "composition name must not be empty"),
            Self::TempoOutOfRange(tempo) => write!(
                f,
                "tempo {tempo} is outside {MIN_TEMPO_BPM}..={MAX_TEMPO_BPM} bpm"
            ),
            Self::EmptyVoiceId => write!(f, "voice id must not be empty"),
            Self::DuplicateVoiceId(id) => write!(f, "voice id is duplicated: {id}"),
            Self::VolumeOutOfRange { voice_id, volume } => write!(
                f,
                "voice `{voice_id}` volume {volume} exceeds {MAX_VOICE_VOLUME}"
            ),
            Self::UnknownActiveVoice(id) => write!(f, "active voice does not exist: {id}"),
            Self::Note { voice_id, source } => write!(f, "voice `{voice_id}`: {source}"),
        }
    }
}

impl Error for CompositionValidationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Note { source, .. } => Some(source),
            _ => None,
        }
    }
}
