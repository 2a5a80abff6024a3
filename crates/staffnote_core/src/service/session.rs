//! Editing session use-cases.
//!
//! # Responsibility
//! - Own one composition and the id source used while editing it.
//! - Translate palette selection + user gestures into ledger mutations.
//! - Manage voice layers and the active voice.
//!
//! # Invariants
//! - New notes always go to the active voice's ledger.
//! - At most one voice has `active == true`, and it matches
//!   `active_voice_id`.
//! - Ids come exclusively from the injected `IdSource`.

use crate::id::IdSource;
use crate::model::composition::CompositionData;
use crate::model::note::{NoteEntry, NoteId, NoteKind, Position};
use crate::model::voice::{VoiceLayer, DEFAULT_VOICE_COLOR, DEFAULT_VOICE_NAME};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

/// Duration used by the reference scale fixture.
const REFERENCE_SCALE_DURATION: &str = "quarter";

/// Session error for editing use-cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No voice is selected to receive notes.
    NoActiveVoice,
    /// Target voice does not exist in this composition.
    VoiceNotFound(String),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoActiveVoice => write!(f, "no active voice selected"),
            Self::VoiceNotFound(voice_id) => write!(f, "voice not found: {voice_id}"),
        }
    }
}

impl Error for SessionError {}

/// One user's editing surface over one composition.
pub struct EditingSession {
    composition: CompositionData,
    ids: Box<dyn IdSource>,
}

impl EditingSession {
    /// Wraps an existing composition (for example one loaded from storage).
    ///
    /// Voice `active` flags are reconciled with `active_voice_id`. When the
    /// id is missing or unknown, the first voice flagged active is adopted.
    pub fn new(composition: CompositionData, ids: impl IdSource + 'static) -> Self {
        info!(
            "event=session_open module=session status=ok voices={} notes={}",
            composition.voice_layers.len(),
            composition.note_count()
        );
        let mut session = Self {
            composition,
            ids: Box::new(ids),
        };
        session.reconcile_active_voice();
        session
    }

    /// Starts a fresh composition with one active default voice.
    pub fn start(name: impl Into<String>, ids: impl IdSource + 'static) -> Self {
        let mut ids = ids;
        let composition = CompositionData::new(ids.next_id(), name, now_epoch_ms());
        let mut session = Self::new(composition, ids);
        session.add_voice(DEFAULT_VOICE_NAME, DEFAULT_VOICE_COLOR);
        session
    }

    pub fn composition(&self) -> &CompositionData {
        &self.composition
    }

    /// Mutable access for palette and metadata edits.
    pub fn composition_mut(&mut self) -> &mut CompositionData {
        &mut self.composition
    }

    pub fn into_composition(self) -> CompositionData {
        self.composition
    }

    /// Places a pitched note at `position` in the active voice.
    ///
    /// Duration and dot come from the current palette selection. An existing
    /// entry at the same position is replaced.
    pub fn place_note(
        &mut self,
        pitch: impl Into<String>,
        position: Position,
    ) -> Result<NoteId, SessionError> {
        let pitch = pitch.into();
        self.place(NoteKind::Note, Some(pitch), position)
    }

    /// Places a rest at `position` in the active voice.
    pub fn place_rest(&mut self, position: Position) -> Result<NoteId, SessionError> {
        self.place(NoteKind::Rest, None, position)
    }

    /// Places whatever the palette's selected note type is.
    pub fn place_selected(
        &mut self,
        pitch: Option<String>,
        position: Position,
    ) -> Result<NoteId, SessionError> {
        let kind = self.composition.selection.selected_note_type;
        let pitch = match kind {
            NoteKind::Note => pitch,
            NoteKind::Rest => None,
        };
        self.place(kind, pitch, position)
    }

    /// Removes a note from the active voice. Unknown ids are ignored.
    pub fn remove_note(&mut self, note_id: &str) -> Result<(), SessionError> {
        let voice = self
            .composition
            .active_voice_mut()
            .ok_or(SessionError::NoActiveVoice)?;
        voice.notes.remove(note_id);
        Ok(())
    }

    /// Clears every note of the active voice.
    pub fn clear_active_voice(&mut self) -> Result<(), SessionError> {
        let voice = self
            .composition
            .active_voice_mut()
            .ok_or(SessionError::NoActiveVoice)?;
        voice.notes.clear();
        Ok(())
    }

    /// Appends a new voice. The first voice of a composition becomes active.
    pub fn add_voice(&mut self, name: impl Into<String>, color: impl Into<String>) -> String {
        let voice_id = self.ids.next_id();
        self.composition
            .voice_layers
            .push(VoiceLayer::new(voice_id.clone(), name, color));

        if self.composition.active_voice().is_none() {
            self.activate(&voice_id);
        }

        info!(
            "event=voice_add module=session status=ok voices={}",
            self.composition.voice_layers.len()
        );
        voice_id
    }

    /// Makes `voice_id` the voice that receives new notes.
    pub fn set_active_voice(&mut self, voice_id: &str) -> Result<(), SessionError> {
        if self.composition.voice(voice_id).is_none() {
            warn!("event=voice_activate module=session status=error error_code=voice_not_found");
            return Err(SessionError::VoiceNotFound(voice_id.to_string()));
        }
        self.activate(voice_id);
        Ok(())
    }

    /// Replaces the active voice's notes with the clef's reference scale.
    ///
    /// Entries get ids `test-{index}` and positions `index + 1`.
    pub fn load_reference_scale(&mut self) -> Result<(), SessionError> {
        let clef = self.composition.clef;
        let voice = self
            .composition
            .active_voice_mut()
            .ok_or(SessionError::NoActiveVoice)?;

        voice.notes.clear();
        for (index, pitch) in clef.reference_scale().iter().enumerate() {
            voice.notes.add(NoteEntry::note(
                format!("test-{index}"),
                *pitch,
                REFERENCE_SCALE_DURATION,
                index as Position + 1,
            ));
        }

        info!(
            "event=reference_scale module=session status=ok clef={} notes={}",
            clef.as_str(),
            voice.notes.len()
        );
        Ok(())
    }

    fn place(
        &mut self,
        kind: NoteKind,
        pitch: Option<String>,
        position: Position,
    ) -> Result<NoteId, SessionError> {
        if self.composition.active_voice().is_none() {
            return Err(SessionError::NoActiveVoice);
        }

        let selection = &self.composition.selection;
        let entry = NoteEntry {
            id: self.ids.next_id(),
            kind,
            pitch,
            duration: selection.selected_duration.clone(),
            position,
            vertical_position: 0,
            dotted: selection.is_dotted_note,
            lyric: None,
        };
        let note_id = entry.id.clone();

        let voice = self
            .composition
            .active_voice_mut()
            .ok_or(SessionError::NoActiveVoice)?;
        voice.notes.add(entry);
        Ok(note_id)
    }

    fn reconcile_active_voice(&mut self) {
        let named = self
            .composition
            .active_voice_id
            .clone()
            .filter(|voice_id| self.composition.voice(voice_id).is_some());
        let adopted = named.or_else(|| {
            self.composition
                .voice_layers
                .iter()
                .find(|voice| voice.active)
                .map(|voice| voice.id.clone())
        });

        match adopted {
            Some(voice_id) => self.activate(&voice_id),
            None => {
                if let Some(stale) = self.composition.active_voice_id.take() {
                    warn!(
                        "event=session_open module=session status=reconciled reason=unknown_active_voice voice_id={stale}"
                    );
                }
                for voice in self.composition.voice_layers.iter_mut() {
                    voice.active = false;
                }
            }
        }
    }

    fn activate(&mut self, voice_id: &str) {
        for voice in self.composition.voice_layers.iter_mut() {
            voice.active = voice.id == voice_id;
        }
        self.composition.active_voice_id = Some(voice_id.to_string());
    }
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}
