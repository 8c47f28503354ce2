//! Integration tests for session persistence and restoration.
//!
//! These drive two engine instances over the same database file to model a
//! full application reload: the first instance runs and persists a session,
//! the second restores it cold.

use kairo_core::storage::{Config, Database, PersistedSession};
use kairo_core::{RunState, SessionEngine, SessionFamily};

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64
}

fn open_pair(dir: &tempfile::TempDir) -> (Database, Database) {
    let path = dir.path().join("kairo.db");
    (
        Database::open_at(&path).unwrap(),
        Database::open_at(&path).unwrap(),
    )
}

#[test]
fn paused_session_survives_reload_exactly() {
    let dir = tempfile::tempdir().unwrap();
    let (db_a, db_b) = open_pair(&dir);

    // First run: start the 25-minute mode, pause with 1400s left.
    let mut first = SessionEngine::new(db_a, Config::default());
    first.select_mode(3).unwrap();
    first.start().unwrap();
    first.pause().unwrap();

    // Force the frozen remaining time to a known value, as if 100 seconds
    // had elapsed before the pause.
    let db = Database::open_at(&dir.path().join("kairo.db")).unwrap();
    let snap = db.load_session().unwrap();
    db.save_session(&PersistedSession {
        time_left: 1400,
        ..snap
    })
    .unwrap();

    // Reload: paused restores are verbatim, not wall-clock-recomputed.
    let mut second = SessionEngine::new(db_b, Config::default());
    assert!(second.restore().is_none());
    assert_eq!(second.run_state(), RunState::Paused);
    assert_eq!(second.remaining_seconds(), 1400);
    assert_eq!(second.active_mode().id, 3);
}

#[test]
fn running_session_resumes_within_one_second() {
    let dir = tempfile::tempdir().unwrap();
    let (db_a, db_b) = open_pair(&dir);

    let mut first = SessionEngine::new(db_a, Config::default());
    first.start().unwrap();
    let before = first.remaining_seconds();

    let mut second = SessionEngine::new(db_b, Config::default());
    assert!(second.restore().is_none());
    assert_eq!(second.run_state(), RunState::Running);
    let after = second.remaining_seconds();
    assert!(before - after <= 1, "lost {}s across reload", before - after);
}

#[test]
fn break_that_expired_while_unloaded_completes_on_reload() {
    let dir = tempfile::tempdir().unwrap();
    let (db_a, db_b) = open_pair(&dir);

    // A 5-minute break whose end time is already in the past.
    let now = now_ms();
    db_a.save_session(&PersistedSession {
        mode_id: 101,
        family: SessionFamily::Break,
        end_time: Some(now - 60_000),
        time_left: 0,
        total_duration: 300,
        is_paused: false,
        last_updated: now - 360_000,
        session_count: 1,
    })
    .unwrap();

    let mut engine = SessionEngine::new(db_b, Config::default());
    let completed = engine.restore();
    assert!(completed.is_some(), "expired session must complete, not resume");

    // A focus mode is auto-selected and the log gained one 5.0-minute
    // break entry.
    assert_eq!(engine.family(), SessionFamily::Focus);
    let history = Database::open_at(&dir.path().join("kairo.db"))
        .unwrap()
        .list_all()
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].family, SessionFamily::Break);
    assert_eq!(history[0].duration_minutes, 5.0);
}

#[test]
fn family_switch_while_running_replaces_the_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let (db_a, db_b) = open_pair(&dir);

    let mut engine = SessionEngine::new(db_a, Config::default());
    engine.start().unwrap();
    engine.switch_family().unwrap();
    assert_eq!(engine.run_state(), RunState::Running);

    // The only snapshot on disk belongs to the new family.
    let snap = db_b.load_session().unwrap();
    assert_eq!(snap.family, SessionFamily::Break);
    assert!(!snap.is_paused);
    assert_eq!(snap.mode_id, 101);
}

#[test]
fn custom_mode_session_restores_into_current_custom_slot() {
    let dir = tempfile::tempdir().unwrap();
    let (db_a, db_b) = open_pair(&dir);

    let mut config = Config::default();
    config.timer.custom_focus_seconds = 90.0;

    let mut first = SessionEngine::new(db_a, config.clone());
    first.select_mode(kairo_core::CUSTOM_FOCUS_ID).unwrap();
    first.start().unwrap();
    first.pause().unwrap();

    let mut second = SessionEngine::new(db_b, config);
    assert!(second.restore().is_none());
    assert_eq!(second.active_mode().id, kairo_core::CUSTOM_FOCUS_ID);
    assert_eq!(second.active_mode().duration_seconds, Some(90));
}

#[test]
fn corrupt_snapshot_falls_back_to_idle() {
    let dir = tempfile::tempdir().unwrap();
    let (db_a, db_b) = open_pair(&dir);

    db_a.kv_set("active_session", "{{{ definitely not json").unwrap();

    let mut engine = SessionEngine::new(db_b, Config::default());
    assert!(engine.restore().is_none());
    assert_eq!(engine.run_state(), RunState::Idle);
    assert_eq!(engine.family(), SessionFamily::Focus);
}
