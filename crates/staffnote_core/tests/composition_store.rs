use staffnote_core::db::open_db_in_memory;
use staffnote_core::{
    Clef, CompositionData, CompositionListQuery, CompositionRepository, CompositionService,
    CompositionServiceError, EditingSession, NoteEntry, RepoError, SequentialIdSource,
    SqliteCompositionRepository,
};

fn composition_with_notes(id: &str, date_created: i64, notes: usize) -> CompositionData {
    let mut session = EditingSession::new(
        CompositionData::new(id, format!("Piece {id}"), date_created),
        SequentialIdSource::new(id),
    );
    session.add_voice("Voice 1", "#000000");
    for position in 0..notes {
        session.place_note("C4", position as i64).unwrap();
    }
    session.into_composition()
}

#[test]
fn save_and_open_roundtrip_preserves_ledger_order() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCompositionRepository::try_new(&conn).unwrap();
    let service = CompositionService::new(repo);

    let mut composition = composition_with_notes("c1", 10, 0);
    let voice = composition.active_voice_mut().unwrap();
    voice.notes.add(NoteEntry::note("late", "E5", "quarter", 8));
    voice.notes.add(NoteEntry::rest("early", "half", 2));
    composition.clef = Clef::Bass;

    let summary = service.save(&composition).unwrap();
    assert_eq!(summary.id, "c1");
    assert_eq!(summary.clef, Clef::Bass);
    assert_eq!(summary.note_count, 2);

    let loaded = service.open("c1").unwrap();
    assert_eq!(loaded, composition);
    let ids: Vec<&str> = loaded
        .active_voice()
        .unwrap()
        .notes
        .iter()
        .map(|entry| entry.id.as_str())
        .collect();
    assert_eq!(ids, vec!["late", "early"]);
}

#[test]
fn saving_again_replaces_stored_composition() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCompositionRepository::try_new(&conn).unwrap();
    let service = CompositionService::new(repo);

    let mut composition = composition_with_notes("c1", 10, 3);
    service.save(&composition).unwrap();

    composition.name = "Renamed".to_string();
    composition.active_voice_mut().unwrap().notes.clear();
    let summary = service.save(&composition).unwrap();

    assert_eq!(summary.name, "Renamed");
    assert_eq!(summary.note_count, 0);
    assert_eq!(service.list(None, 0).unwrap().items.len(), 1);
    assert_eq!(service.open("c1").unwrap().note_count(), 0);
}

#[test]
fn list_orders_by_creation_desc_and_paginates() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCompositionRepository::try_new(&conn).unwrap();
    let service = CompositionService::new(repo);
    for (id, created) in [("b", 200), ("a", 200), ("old", 100), ("new", 300)] {
        service
            .save(&composition_with_notes(id, created, 1))
            .unwrap();
    }

    let listed = service.list(Some(10), 0).unwrap();
    let ids: Vec<&str> = listed.items.iter().map(|item| item.id.as_str()).collect();
    assert_eq!(ids, vec!["new", "a", "b", "old"]);

    let page = service.list(Some(2), 1).unwrap();
    let ids: Vec<&str> = page.items.iter().map(|item| item.id.as_str()).collect();
    assert_eq!(page.applied_limit, 2);
    assert_eq!(ids, vec!["a", "b"]);
}

#[test]
fn list_limit_defaults_to_20_and_caps_at_100() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCompositionRepository::try_new(&conn).unwrap();
    let service = CompositionService::new(repo);
    for idx in 0..120 {
        service
            .save(&composition_with_notes(&format!("c{idx}"), idx, 0))
            .unwrap();
    }

    let defaulted = service.list(None, 0).unwrap();
    assert_eq!(defaulted.applied_limit, 20);
    assert_eq!(defaulted.items.len(), 20);

    let capped = service.list(Some(1_000), 0).unwrap();
    assert_eq!(capped.applied_limit, 100);
    assert_eq!(capped.items.len(), 100);
}

#[test]
fn invalid_composition_is_rejected_before_write() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCompositionRepository::try_new(&conn).unwrap();
    let service = CompositionService::new(repo);

    let mut composition = composition_with_notes("c1", 1, 0);
    let mut bad_rest = NoteEntry::rest("r1", "quarter", 1);
    bad_rest.pitch = Some("C4".to_string());
    composition.active_voice_mut().unwrap().notes.add(bad_rest);

    let err = service.save(&composition).unwrap_err();
    assert!(matches!(err, CompositionServiceError::Invalid(_)));
    assert!(service.list(None, 0).unwrap().items.is_empty());
}

#[test]
fn open_and_delete_missing_composition_report_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCompositionRepository::try_new(&conn).unwrap();
    let service = CompositionService::new(repo);

    assert!(matches!(
        service.open("ghost").unwrap_err(),
        CompositionServiceError::CompositionNotFound(id) if id == "ghost"
    ));
    assert!(matches!(
        service.delete("ghost").unwrap_err(),
        CompositionServiceError::CompositionNotFound(_)
    ));
}

#[test]
fn delete_removes_composition() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCompositionRepository::try_new(&conn).unwrap();
    repo.save_composition(&composition_with_notes("c1", 1, 2))
        .unwrap();

    repo.delete_composition("c1").unwrap();

    assert!(repo.get_composition("c1").unwrap().is_none());
    assert!(repo
        .list_compositions(&CompositionListQuery::default())
        .unwrap()
        .is_empty());
}

#[test]
fn body_with_mismatched_id_is_rejected_on_read() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCompositionRepository::try_new(&conn).unwrap();
    repo.save_composition(&composition_with_notes("c1", 1, 1))
        .unwrap();

    conn.execute("UPDATE compositions SET uuid = 'c2' WHERE uuid = 'c1';", [])
        .unwrap();

    let err = repo.get_composition("c2").unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
}

#[test]
fn repository_requires_migrated_connection() {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    let err = SqliteCompositionRepository::try_new(&conn).err().unwrap();
    assert!(matches!(err, RepoError::MissingRequiredTable("compositions")));
}

#[test]
fn session_edits_survive_save_and_reopen() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCompositionRepository::try_new(&conn).unwrap();
    let service = CompositionService::new(repo);

    let mut session = EditingSession::start("Roundtrip", SequentialIdSource::new("s"));
    session.load_reference_scale().unwrap();
    let saved = service.save(session.composition()).unwrap();
    assert_eq!(saved.note_count, 20);

    let reopened = service.open(&saved.id).unwrap();
    let mut session = EditingSession::new(reopened, SequentialIdSource::new("t"));
    session.remove_note("test-0").unwrap();
    let summary = service.save(session.composition()).unwrap();

    assert_eq!(summary.note_count, 19);
}
