//! End-to-end session tests against SQLite, including interrupted writes.

use std::cell::Cell;

use chrono::{Duration, Utc};
use spacetrack_core::storage::{
    CatalogRepository, Database, EngineConfig, LogRepository, NoteRepository, SpaceRepository,
    WasteRepository,
};
use spacetrack_core::{
    Action, ClockMarker, Comment, CoreError, DatabaseError, Event, LogEntry, LogEvent, LogKind,
    MultiStepAction, NewAction, NewComment, NewLogEntry, NewMultiStepAction, NewSpace, NewTodo,
    NewWasteEntry, Rejection, SessionController, Space, SpacePatch, Todo, WasteEntry,
};
use uuid::Uuid;

type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailPoint {
    AppendLog,
    UpdateSpace,
}

/// Database wrapper that fails the next call at a chosen point.
struct FlakyStore {
    db: Database,
    fail_next: Cell<Option<FailPoint>>,
}

impl FlakyStore {
    fn new(db: Database) -> Self {
        Self {
            db,
            fail_next: Cell::new(None),
        }
    }

    fn fail_next(&self, point: FailPoint) {
        self.fail_next.set(Some(point));
    }

    fn check(&self, point: FailPoint) -> Result<()> {
        if self.fail_next.get() == Some(point) {
            self.fail_next.set(None);
            return Err(DatabaseError::Locked.into());
        }
        Ok(())
    }
}

impl SpaceRepository for FlakyStore {
    fn create_space(&self, new: NewSpace) -> Result<Space> {
        self.db.create_space(new)
    }
    fn get_space(&self, id: Uuid) -> Result<Option<Space>> {
        self.db.get_space(id)
    }
    fn update_space(&self, id: Uuid, patch: &SpacePatch) -> Result<Space> {
        self.check(FailPoint::UpdateSpace)?;
        self.db.update_space(id, patch)
    }
    fn list_spaces(&self) -> Result<Vec<Space>> {
        self.db.list_spaces()
    }
}

impl LogRepository for FlakyStore {
    fn append_log(&self, entry: NewLogEntry) -> Result<LogEntry> {
        self.check(FailPoint::AppendLog)?;
        self.db.append_log(entry)
    }
    fn list_logs(&self, space_id: Uuid) -> Result<Vec<LogEntry>> {
        self.db.list_logs(space_id)
    }
}

impl CatalogRepository for FlakyStore {
    fn create_action(&self, new: NewAction) -> Result<Action> {
        self.db.create_action(new)
    }
    fn get_action(&self, id: Uuid) -> Result<Option<Action>> {
        self.db.get_action(id)
    }
    fn list_actions(&self, space_id: Uuid) -> Result<Vec<Action>> {
        self.db.list_actions(space_id)
    }
    fn create_multi_step_action(&self, new: NewMultiStepAction) -> Result<MultiStepAction> {
        self.db.create_multi_step_action(new)
    }
    fn get_multi_step_action(&self, id: Uuid) -> Result<Option<MultiStepAction>> {
        self.db.get_multi_step_action(id)
    }
    fn list_multi_step_actions(&self, space_id: Uuid) -> Result<Vec<MultiStepAction>> {
        self.db.list_multi_step_actions(space_id)
    }
    fn save_step_progress(&self, action: &MultiStepAction) -> Result<()> {
        self.db.save_step_progress(action)
    }
}

impl WasteRepository for FlakyStore {
    fn add_waste(&self, new: NewWasteEntry) -> Result<WasteEntry> {
        self.db.add_waste(new)
    }
    fn list_waste(&self, space_id: Uuid) -> Result<Vec<WasteEntry>> {
        self.db.list_waste(space_id)
    }
}

impl NoteRepository for FlakyStore {
    fn add_todo(&self, new: NewTodo) -> Result<Todo> {
        self.db.add_todo(new)
    }
    fn get_todo(&self, id: Uuid) -> Result<Option<Todo>> {
        self.db.get_todo(id)
    }
    fn save_todo(&self, todo: &Todo) -> Result<()> {
        self.db.save_todo(todo)
    }
    fn list_todos(&self, space_id: Uuid) -> Result<Vec<Todo>> {
        self.db.list_todos(space_id)
    }
    fn add_comment(&self, new: NewComment) -> Result<Comment> {
        self.db.add_comment(new)
    }
    fn list_comments(&self, space_id: Uuid) -> Result<Vec<Comment>> {
        self.db.list_comments(space_id)
    }
}

fn flaky_controller(name: &str) -> SessionController<FlakyStore> {
    let db = Database::open_memory().unwrap();
    let space = db.create_space(NewSpace::named(name)).unwrap();
    SessionController::load(FlakyStore::new(db), space.id, EngineConfig::default()).unwrap()
}

fn kinds(logs: &[LogEntry]) -> Vec<LogKind> {
    logs.iter().map(LogEntry::kind).collect()
}

#[test]
fn full_workday() {
    let db = Database::open_memory().unwrap();
    let space = db.create_space(NewSpace::named("Workshop")).unwrap();
    let sweep = db
        .create_action(NewAction {
            space_id: space.id,
            name: "Sweep".into(),
            points: 5,
            description: "Floor and bench".into(),
        })
        .unwrap();
    let ctl = SessionController::load(db, space.id, EngineConfig::default()).unwrap();

    let t0 = Utc::now() - Duration::minutes(30);
    assert!(ctl.clock_in_at(t0).unwrap().is_applied());
    ctl.record_action_at(&sweep, 1, t0 + Duration::minutes(5))
        .unwrap();
    ctl.record_action_at(&sweep, 10, t0 + Duration::minutes(10))
        .unwrap();
    ctl.log_waste("Waiting", 3).unwrap();
    let view = ctl
        .clock_out_at(t0 + Duration::minutes(30))
        .unwrap()
        .applied()
        .unwrap();

    assert_eq!(view.space.total_clocked_in_time, 30);
    assert_eq!(view.scoreboard.total_points, 55);
    assert_eq!(view.scoreboard.session_points, 55);
    assert_eq!(view.scoreboard.total_waste_points, 3);
    assert_eq!(view.scoreboard.net_points, 52);
    assert!((view.scoreboard.ap_per_hour - 110.0).abs() < 1e-9);

    let logs = ctl.store().list_logs(space.id).unwrap();
    assert_eq!(
        kinds(&logs),
        vec![
            LogKind::ClockOut,
            LogKind::Action,
            LogKind::Action,
            LogKind::ClockIn
        ]
    );
}

#[test]
fn failed_clock_in_state_write_leaves_orphan_entry() {
    let ctl = flaky_controller("Kitchen");
    ctl.store().fail_next(FailPoint::UpdateSpace);

    let err = ctl.clock_in().unwrap_err();
    assert!(matches!(err, CoreError::Database(DatabaseError::Locked)));
    assert!(!ctl.is_clocked_in());
    assert!(!ctl.is_clock_loading());

    let logs = ctl.store().list_logs(ctl.space_id()).unwrap();
    assert_eq!(kinds(&logs), vec![LogKind::ClockIn]);
    let stored = ctl.store().get_space(ctl.space_id()).unwrap().unwrap();
    assert!(!stored.is_clocked_in);

    // The next attempt succeeds normally.
    assert!(ctl.clock_in().unwrap().is_applied());
}

#[test]
fn failed_ledger_append_writes_nothing() {
    let ctl = flaky_controller("Pantry");
    let before = ctl.store().get_space(ctl.space_id()).unwrap().unwrap();
    ctl.store().fail_next(FailPoint::AppendLog);

    assert!(ctl.clock_in().is_err());
    assert!(ctl.store().list_logs(ctl.space_id()).unwrap().is_empty());
    assert_eq!(
        ctl.store().get_space(ctl.space_id()).unwrap().unwrap(),
        before
    );
}

#[test]
fn lost_clock_out_write_is_repaired_on_reload() {
    let ctl = flaky_controller("Basement");
    let t0 = Utc::now() - Duration::minutes(3);
    ctl.clock_in_at(t0).unwrap();

    ctl.store().fail_next(FailPoint::UpdateSpace);
    assert!(ctl.clock_out().is_err());
    assert!(ctl.is_clocked_in());

    let space_id = ctl.space_id();
    let stored = ctl.store().get_space(space_id).unwrap().unwrap();
    assert!(stored.is_clocked_in);
    assert_eq!(stored.total_clocked_in_time, 0);

    let reloaded =
        SessionController::load(ctl.into_store(), space_id, EngineConfig::default()).unwrap();
    assert!(!reloaded.is_clocked_in());
    assert_eq!(reloaded.space().total_clocked_in_time, 3);
    let logs = reloaded.store().list_logs(space_id).unwrap();
    assert_eq!(kinds(&logs), vec![LogKind::ClockOut, LogKind::ClockIn]);
}

#[test]
fn retried_clock_out_counts_the_session_once() {
    let ctl = flaky_controller("Cellar");
    let t0 = Utc::now() - Duration::minutes(10);
    let t1 = t0 + Duration::minutes(3);
    ctl.clock_in_at(t0).unwrap();

    ctl.store().fail_next(FailPoint::UpdateSpace);
    assert!(ctl.clock_out_at(t1).is_err());

    // The user simply presses clock-out again, a little later.
    let view = ctl
        .clock_out_at(t1 + Duration::seconds(40))
        .unwrap()
        .applied()
        .unwrap();
    assert_eq!(view.space.total_clocked_in_time, 3);
    assert!(!view.is_clocked_in);
    assert_eq!(view.current_session_elapsed_time, 180);

    let space_id = ctl.space_id();
    let logs = ctl.store().list_logs(space_id).unwrap();
    assert_eq!(kinds(&logs), vec![LogKind::ClockOut, LogKind::ClockIn]);
    assert!(matches!(
        ctl.drain_events().last(),
        Some(Event::ClockedOut {
            minutes_clocked_in: 3,
            ..
        })
    ));

    let reloaded =
        SessionController::load(ctl.into_store(), space_id, EngineConfig::default()).unwrap();
    assert_eq!(reloaded.space().total_clocked_in_time, 3);
    assert!(reloaded.drain_events().is_empty());
}

#[test]
fn reload_reconciles_crash_between_clock_out_writes() {
    let db = Database::open_memory().unwrap();
    let space = db.create_space(NewSpace::named("Attic")).unwrap();
    let t0 = Utc::now() - Duration::minutes(10);
    let t1 = t0 + Duration::minutes(4);

    // Ledger says the session ended; the space write never happened.
    db.append_log(NewLogEntry::clock_in(space.id, t0)).unwrap();
    db.update_space(
        space.id,
        &SpacePatch::clock(ClockMarker::In { since: t0 }, t0),
    )
    .unwrap();
    db.append_log(NewLogEntry::clock_out(space.id, t0, t1, 4))
        .unwrap();

    let ctl = SessionController::load(db, space.id, EngineConfig::default()).unwrap();
    assert!(!ctl.is_clocked_in());
    assert_eq!(ctl.space().total_clocked_in_time, 4);

    let stored = ctl.store().get_space(space.id).unwrap().unwrap();
    assert!(!stored.is_clocked_in);
    assert!(stored.clock_in_start_time.is_none());
    assert!(matches!(
        ctl.drain_events().as_slice(),
        [Event::SpaceReconciled {
            previous_total_minutes: 0,
            total_minutes: 4,
            cleared_stale_clock: true,
            ..
        }]
    ));
}

#[test]
fn reconciliation_can_be_disabled() {
    let db = Database::open_memory().unwrap();
    let space = db.create_space(NewSpace::named("Shed")).unwrap();
    let t0 = Utc::now() - Duration::minutes(2);
    db.append_log(NewLogEntry::clock_out(space.id, t0, Utc::now(), 2))
        .unwrap();

    let config = EngineConfig {
        reconcile_on_load: false,
        ..EngineConfig::default()
    };
    let ctl = SessionController::load(db, space.id, config).unwrap();
    assert_eq!(ctl.space().total_clocked_in_time, 0);
    assert!(ctl.drain_events().is_empty());
}

#[test]
fn orphan_clock_in_does_not_resume_session() {
    let db = Database::open_memory().unwrap();
    let space = db.create_space(NewSpace::named("Closet")).unwrap();
    db.append_log(NewLogEntry::clock_in(space.id, Utc::now()))
        .unwrap();

    let ctl = SessionController::load(db, space.id, EngineConfig::default()).unwrap();
    assert!(!ctl.is_clocked_in());
    assert!(ctl.drain_events().is_empty());
}

#[test]
fn record_is_guarded_independently_of_clock() {
    let ctl = flaky_controller("Office");
    let action = ctl
        .store()
        .create_action(NewAction {
            space_id: ctl.space_id(),
            name: "File papers".into(),
            points: 2,
            description: String::new(),
        })
        .unwrap();
    ctl.clock_in().unwrap();

    let _clock = ctl
        .in_flight()
        .try_begin(spacetrack_core::session::OperationKind::Clock)
        .unwrap();
    assert!(ctl.record_action(&action, 1).unwrap().is_applied());

    let _record = ctl
        .in_flight()
        .try_begin(spacetrack_core::session::OperationKind::Record)
        .unwrap();
    assert_eq!(
        ctl.record_action(&action, 1).unwrap().rejection(),
        Some(Rejection::InFlight)
    );
    assert_eq!(
        ctl.log_waste("Motion", 1).unwrap().rejection(),
        Some(Rejection::InFlight)
    );
}

#[test]
fn waste_keeps_the_given_timestamp() {
    let ctl = flaky_controller("Loft");
    let at = Utc::now() - Duration::hours(2);
    let entry = ctl
        .log_waste_at("Waiting", 2, at)
        .unwrap()
        .applied()
        .unwrap();
    assert_eq!(entry.timestamp, at);
    assert_eq!(ctl.space().date_modified, at);

    let stored = ctl.store().list_waste(ctl.space_id()).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].timestamp, at);
    assert_eq!(stored[0].category, "Waiting");
}

#[test]
fn clocked_in_session_survives_reopen_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("spacetrack.db");
    let start = Utc::now() - Duration::seconds(90);

    let space_id = {
        let db = Database::open_at(&path).unwrap();
        let space = db.create_space(NewSpace::named("Studio")).unwrap();
        let ctl = SessionController::load(db, space.id, EngineConfig::default()).unwrap();
        ctl.clock_in_at(start).unwrap();
        space.id
    };

    let db = Database::open_at(&path).unwrap();
    let ctl = SessionController::load(db, space_id, EngineConfig::default()).unwrap();
    assert!(ctl.is_clocked_in());
    assert_eq!(ctl.clock_in_start_time(), Some(start));
    assert!(ctl.current_session_elapsed_secs() >= 90);

    let view = ctl.clock_out().unwrap().applied().unwrap();
    assert!(view.space.total_clocked_in_time >= 1);
    match ctl.store().list_logs(space_id).unwrap()[0].event {
        LogEvent::ClockOut { clock_in_time, .. } => assert_eq!(clock_in_time, start),
        other => panic!("Expected ClockOut, got {other:?}"),
    }
}
