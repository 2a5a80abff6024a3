use staffnote_core::{
    Clef, CompositionData, EditingSession, LedgerChange, NoteKind, SequentialIdSource,
    SessionError, VoiceLayer,
};
use std::cell::RefCell;
use std::rc::Rc;

fn started() -> EditingSession {
    EditingSession::start("Sketch", SequentialIdSource::new("id"))
}

fn active_ids(session: &EditingSession) -> Vec<String> {
    session
        .composition()
        .active_voice()
        .map(|voice| voice.notes.iter().map(|entry| entry.id.clone()).collect())
        .unwrap_or_default()
}

#[test]
fn placed_notes_take_ids_and_palette_selection() {
    let mut session = started();
    session.composition_mut().selection.selected_duration = "half".to_string();
    session.composition_mut().selection.is_dotted_note = true;

    let note_id = session.place_note("E4", 1).unwrap();
    let rest_id = session.place_rest(2).unwrap();

    assert_eq!(note_id, "id-2");
    assert_eq!(rest_id, "id-3");

    let voice = session.composition().active_voice().unwrap();
    let note = voice.notes.get(&note_id).unwrap();
    assert_eq!(note.pitch.as_deref(), Some("E4"));
    assert_eq!(note.duration, "half");
    assert!(note.dotted);
    let rest = voice.notes.get(&rest_id).unwrap();
    assert_eq!(rest.kind, NoteKind::Rest);
    assert_eq!(rest.pitch, None);
}

#[test]
fn placing_on_occupied_position_replaces_in_place() {
    let mut session = started();
    session.place_note("C4", 1).unwrap();
    session.place_note("D4", 2).unwrap();
    let replacement = session.place_rest(1).unwrap();

    assert_eq!(active_ids(&session), vec![replacement.clone(), "id-3".to_string()]);
}

#[test]
fn place_selected_follows_palette_note_type() {
    let mut session = started();
    session.composition_mut().selection.selected_note_type = NoteKind::Rest;

    let id = session.place_selected(Some("C4".to_string()), 4).unwrap();

    let voice = session.composition().active_voice().unwrap();
    let entry = voice.notes.get(&id).unwrap();
    assert_eq!(entry.kind, NoteKind::Rest);
    assert_eq!(entry.pitch, None);
}

#[test]
fn remove_and_clear_only_touch_active_voice() {
    let mut session = started();
    let first_voice = session.composition().active_voice_id.clone().unwrap();
    let kept = session.place_note("C4", 1).unwrap();

    let second_voice = session.add_voice("Bass line", "#00aa00");
    session.set_active_voice(&second_voice).unwrap();
    session.place_note("C3", 1).unwrap();
    session.place_note("G2", 2).unwrap();

    session.remove_note(&kept).unwrap();
    session.remove_note("unknown").unwrap();
    assert_eq!(
        session.composition().voice(&first_voice).unwrap().notes.len(),
        1
    );

    session.clear_active_voice().unwrap();
    assert!(session
        .composition()
        .voice(&second_voice)
        .unwrap()
        .notes
        .is_empty());
    assert_eq!(session.composition().note_count(), 1);
}

#[test]
fn only_one_voice_is_flagged_active() {
    let mut session = started();
    let second = session.add_voice("Alto", "#ff0000");
    let third = session.add_voice("Tenor", "#0000ff");

    session.set_active_voice(&third).unwrap();

    let active: Vec<&str> = session
        .composition()
        .voice_layers
        .iter()
        .filter(|voice| voice.active)
        .map(|voice| voice.id.as_str())
        .collect();
    assert_eq!(active, vec![third.as_str()]);
    assert_ne!(second, third);
    assert_eq!(
        session.set_active_voice("missing").unwrap_err(),
        SessionError::VoiceNotFound("missing".to_string())
    );
}

#[test]
fn reference_scale_replaces_active_voice_for_clef() {
    let mut session = started();
    session.place_note("C4", 99).unwrap();

    session.load_reference_scale().unwrap();
    let voice = session.composition().active_voice().unwrap();
    assert_eq!(voice.notes.len(), 20);
    let first = &voice.notes.entries()[0];
    assert_eq!(first.id, "test-0");
    assert_eq!(first.position, 1);
    assert_eq!(first.pitch.as_deref(), Some("A5"));
    assert_eq!(first.duration, "quarter");
    assert_eq!(voice.notes.entries()[19].pitch.as_deref(), Some("C3"));

    session.composition_mut().clef = Clef::Bass;
    session.load_reference_scale().unwrap();
    let voice = session.composition().active_voice().unwrap();
    assert_eq!(voice.notes.entries()[0].pitch.as_deref(), Some("C4"));
    assert_eq!(voice.notes.entries()[19].pitch.as_deref(), Some("E1"));
    assert_eq!(voice.notes.entries()[19].position, 20);
}

#[test]
fn loaded_composition_keeps_its_active_voice() {
    let mut composition = CompositionData::new("c1", "Loaded", 5);
    let mut voice = VoiceLayer::new("v9", "Voice", "#123456");
    voice.active = true;
    composition.voice_layers.push(voice);
    composition.active_voice_id = Some("v9".to_string());

    let mut session = EditingSession::new(composition, || "fixed".to_string());
    let id = session.place_note("A4", 1).unwrap();

    assert_eq!(id, "fixed");
    assert_eq!(session.into_composition().note_count(), 1);
}

fn flagged_active(session: &EditingSession) -> Vec<String> {
    session
        .composition()
        .voice_layers
        .iter()
        .filter(|voice| voice.active)
        .map(|voice| voice.id.clone())
        .collect()
}

#[test]
fn opening_session_aligns_active_flags_with_active_voice_id() {
    let mut composition = CompositionData::new("c1", "Loaded", 5);
    let mut first = VoiceLayer::new("v1", "Soprano", "#111111");
    first.active = true;
    composition.voice_layers.push(first);
    composition
        .voice_layers
        .push(VoiceLayer::new("v2", "Alto", "#222222"));
    composition.active_voice_id = Some("v2".to_string());

    let mut session = EditingSession::new(composition, SequentialIdSource::new("n"));

    assert_eq!(flagged_active(&session), vec!["v2".to_string()]);
    session.place_note("C4", 1).unwrap();
    assert_eq!(session.composition().voice("v2").unwrap().notes.len(), 1);
}

#[test]
fn opening_session_adopts_flagged_voice_when_id_is_missing() {
    let mut composition = CompositionData::new("c1", "Loaded", 5);
    composition
        .voice_layers
        .push(VoiceLayer::new("v1", "Soprano", "#111111"));
    let mut second = VoiceLayer::new("v2", "Alto", "#222222");
    second.active = true;
    composition.voice_layers.push(second);
    composition.active_voice_id = Some("gone".to_string());

    let session = EditingSession::new(composition, SequentialIdSource::new("n"));

    assert_eq!(
        session.composition().active_voice_id.as_deref(),
        Some("v2")
    );
    assert_eq!(flagged_active(&session), vec!["v2".to_string()]);
}

#[test]
fn opening_session_without_any_active_voice_clears_stale_id() {
    let mut composition = CompositionData::new("c1", "Loaded", 5);
    composition
        .voice_layers
        .push(VoiceLayer::new("v1", "Soprano", "#111111"));
    composition.active_voice_id = Some("gone".to_string());

    let mut session = EditingSession::new(composition, SequentialIdSource::new("n"));

    assert_eq!(session.composition().active_voice_id, None);
    assert!(flagged_active(&session).is_empty());
    assert_eq!(
        session.place_note("C4", 1).unwrap_err(),
        SessionError::NoActiveVoice
    );
}

#[test]
fn observers_on_voice_ledger_follow_session_edits() {
    let mut session = started();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    session
        .composition_mut()
        .active_voice_mut()
        .unwrap()
        .notes
        .subscribe(move |change, _| sink.borrow_mut().push(change.clone()));

    let id = session.place_note("C4", 1).unwrap();
    session.remove_note(&id).unwrap();

    assert_eq!(
        *seen.borrow(),
        vec![
            LedgerChange::Added {
                id: id.clone(),
                position: 1
            },
            LedgerChange::Removed { id, position: 1 },
        ]
    );
}
