//! Session controller implementation.
//!
//! Drives one space through clock sessions and scoring. The controller is
//! single-threaded and cooperative: methods take `&self`, state lives in
//! `Cell`/`RefCell`, and overlapping operations are turned away by the
//! [`InFlight`] guard rather than by a lock.
//!
//! ## Write order
//!
//! ```text
//! validate -> ledger append -> space update -> engine transition -> view
//! ```
//!
//! A failure returns the error and keeps whatever was already written.
//! Nothing is rolled back and nothing is retried.

use std::cell::{Cell, RefCell};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::guard::{InFlight, OperationKind};
use super::view::{Outcome, Recorded, Rejection, SessionView, StepRecorded};
use crate::clock::{whole_minutes, ClockEngine};
use crate::error::{CoreError, Result, ValidationError};
use crate::events::Event;
use crate::model::{
    Action, ClockMarker, Comment, LogEntry, LogEvent, MultiStepAction, NewComment, NewLogEntry,
    NewTodo, NewWasteEntry, Space, SpacePatch, Todo, WasteEntry,
};
use crate::scoring::{total_clocked_minutes, Scoreboard};
use crate::storage::{EngineConfig, Store};

pub struct SessionController<S: Store> {
    store: S,
    config: EngineConfig,
    space: RefCell<Space>,
    clock: RefCell<ClockEngine>,
    /// Start of the session the view reports on. Survives clock-out so the
    /// frozen display keeps its session figures.
    session_start: Cell<Option<DateTime<Utc>>>,
    in_flight: InFlight,
    events: RefCell<Vec<Event>>,
}

impl<S: Store> SessionController<S> {
    /// Load a space and rebuild its session from persisted markers.
    pub fn load(store: S, space_id: Uuid, config: EngineConfig) -> Result<Self> {
        Self::load_at(store, space_id, config, Utc::now())
    }

    pub fn load_at(
        store: S,
        space_id: Uuid,
        config: EngineConfig,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let space = store
            .get_space(space_id)?
            .ok_or_else(|| CoreError::not_found("Space", space_id))?;

        let mut events = Vec::new();
        let space = if config.reconcile_on_load {
            let (space, repaired) = reconcile(&store, space, now)?;
            events.extend(repaired);
            space
        } else {
            space
        };

        let clock = ClockEngine::restore(&space, now);
        if let Some(start) = clock.started_at() {
            tracing::info!(
                space_id = %space.id,
                elapsed_secs = clock.elapsed_secs(),
                "resuming clocked-in session"
            );
            events.push(Event::SessionResumed {
                space_id: space.id,
                clock_in_start_time: start,
                elapsed_secs: clock.elapsed_secs(),
                at: now,
            });
        }

        Ok(Self {
            store,
            config,
            session_start: Cell::new(clock.started_at()),
            space: RefCell::new(space),
            clock: RefCell::new(clock),
            in_flight: InFlight::new(),
            events: RefCell::new(events),
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Give the store back, e.g. to reload the space.
    pub fn into_store(self) -> S {
        self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn space_id(&self) -> Uuid {
        self.space.borrow().id
    }

    /// The space as last written by this controller.
    pub fn space(&self) -> Space {
        self.space.borrow().clone()
    }

    pub fn is_clocked_in(&self) -> bool {
        self.clock.borrow().is_clocked_in()
    }

    pub fn clock_in_start_time(&self) -> Option<DateTime<Utc>> {
        self.clock.borrow().started_at()
    }

    /// Seconds shown for the current (or just-ended) session.
    pub fn current_session_elapsed_secs(&self) -> u64 {
        self.clock.borrow().elapsed_secs()
    }

    /// True while a clock-in or clock-out is running.
    pub fn is_clock_loading(&self) -> bool {
        self.in_flight.is_busy(OperationKind::Clock)
    }

    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    /// Take the events produced since the last drain.
    pub fn drain_events(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    /// Recompute every derived figure from the ledger.
    pub fn view(&self) -> Result<SessionView> {
        let space = self.space();
        let logs = self.store.list_logs(space.id)?;
        let waste = self.store.list_waste(space.id)?;
        let clock = self.clock.borrow();
        let elapsed = clock.elapsed_secs();
        Ok(SessionView {
            scoreboard: Scoreboard::compute(
                space.id,
                &logs,
                &waste,
                self.session_start.get(),
                elapsed,
            ),
            state: clock.state(),
            is_clocked_in: clock.is_clocked_in(),
            clock_in_start_time: clock.started_at(),
            current_session_elapsed_time: elapsed,
            is_clock_loading: self.is_clock_loading(),
            space,
        })
    }

    pub fn snapshot(&self) -> Event {
        self.clock.borrow().snapshot(Utc::now())
    }

    // ── Clock ────────────────────────────────────────────────────────

    pub fn clock_in(&self) -> Result<Outcome<SessionView>> {
        self.clock_in_at(Utc::now())
    }

    pub fn clock_in_at(&self, now: DateTime<Utc>) -> Result<Outcome<SessionView>> {
        let outcome = self.guarded(OperationKind::Clock, || self.apply_clock_in(now))?;
        self.attach_view(outcome, |(), view| view)
    }

    pub fn clock_out(&self) -> Result<Outcome<SessionView>> {
        self.clock_out_at(Utc::now())
    }

    pub fn clock_out_at(&self, now: DateTime<Utc>) -> Result<Outcome<SessionView>> {
        let outcome = self.guarded(OperationKind::Clock, || self.apply_clock_out(now))?;
        self.attach_view(outcome, |(), view| view)
    }

    /// Host ticker callback. Returns the refreshed elapsed seconds while
    /// clocked in.
    pub fn tick(&self) -> Option<u64> {
        self.tick_at(Utc::now())
    }

    pub fn tick_at(&self, now: DateTime<Utc>) -> Option<u64> {
        self.clock.borrow_mut().tick(now)
    }

    fn apply_clock_in(&self, now: DateTime<Utc>) -> Result<Outcome<()>> {
        if self.is_clocked_in() {
            tracing::warn!(space_id = %self.space_id(), "already clocked in; ignoring");
            return Ok(Outcome::Ignored(Rejection::AlreadyClockedIn));
        }
        let space_id = self.space_id();

        self.store.append_log(NewLogEntry::clock_in(space_id, now))?;
        let space = self.store.update_space(
            space_id,
            &SpacePatch::clock(ClockMarker::In { since: now }, now),
        )?;
        *self.space.borrow_mut() = space;

        let event = self.clock.borrow_mut().clock_in(now);
        self.emit(event);
        self.session_start.set(Some(now));
        tracing::info!(space_id = %space_id, at = %now, "clocked in");
        Ok(Outcome::Applied(()))
    }

    fn apply_clock_out(&self, now: DateTime<Utc>) -> Result<Outcome<()>> {
        let started_at = match self.clock_in_start_time() {
            Some(start) if self.is_clocked_in() => start,
            _ => {
                tracing::warn!(space_id = %self.space_id(), "not clocked in; ignoring clock-out");
                return Ok(Outcome::Ignored(Rejection::NotClockedIn));
            }
        };
        let space_id = self.space_id();

        // A previous attempt may have appended the clock-out and then
        // failed on the space write. Finish that one instead of logging
        // the session twice.
        let logs = self.store.list_logs(space_id)?;
        let (ended_at, minutes) = match logged_clock_out(&logs, started_at) {
            Some(logged) => {
                tracing::warn!(space_id = %space_id, "clock-out already logged; completing state write");
                logged
            }
            None => {
                let minutes = whole_minutes(started_at, now);
                self.store
                    .append_log(NewLogEntry::clock_out(space_id, started_at, now, minutes))?;
                (now, minutes)
            }
        };

        let mut patch = SpacePatch::clock(ClockMarker::Out, now);
        if minutes > 0 {
            let current = self
                .store
                .get_space(space_id)?
                .ok_or_else(|| CoreError::not_found("Space", space_id))?;
            patch = patch.with_total_clocked_in_time(current.total_clocked_in_time + minutes);
        }
        let space = self.store.update_space(space_id, &patch)?;
        *self.space.borrow_mut() = space;

        let event = self.clock.borrow_mut().clock_out(ended_at);
        self.emit(event);
        tracing::info!(space_id = %space_id, minutes, "clocked out");
        Ok(Outcome::Applied(()))
    }

    // ── Recording ────────────────────────────────────────────────────

    pub fn record_action(&self, action: &Action, multiplier: u32) -> Result<Outcome<Recorded>> {
        self.record_action_at(action, multiplier, Utc::now())
    }

    /// Credit `action.points * multiplier` to the ledger.
    ///
    /// # Errors
    /// Fails when not clocked in, when the multiplier is not allowed, or
    /// when the action belongs to another space.
    pub fn record_action_at(
        &self,
        action: &Action,
        multiplier: u32,
        now: DateTime<Utc>,
    ) -> Result<Outcome<Recorded>> {
        let outcome = self.guarded(OperationKind::Record, || {
            self.require_own(action.space_id, "Action", action.id)?;
            if !self.config.allows_multiplier(multiplier) {
                return Err(ValidationError::InvalidMultiplier {
                    multiplier,
                    allowed: self.config.allowed_multipliers.clone(),
                }
                .into());
            }
            self.require_clocked_in()?;

            let points = i64::from(action.points) * i64::from(multiplier);
            let label = if multiplier == 1 {
                action.name.clone()
            } else {
                format!("{} x{multiplier}", action.name)
            };
            let entry = self
                .store
                .append_log(NewLogEntry::action(action.space_id, label, points).at(now))?;
            self.touch(now)?;

            self.emit(Some(Event::ActionRecorded {
                space_id: action.space_id,
                action_id: action.id,
                multiplier,
                points,
                at: now,
            }));
            tracing::debug!(action = %action.name, points, "action recorded");
            Ok(Outcome::Applied(entry))
        })?;
        self.attach_view(outcome, |entry, view| Recorded { entry, view })
    }

    pub fn advance_multi_step_action(
        &self,
        action: &MultiStepAction,
    ) -> Result<Outcome<StepRecorded>> {
        self.advance_multi_step_action_at(action, Utc::now())
    }

    /// Complete the next step of a checklist and credit `points_per_step`.
    ///
    /// Progress is re-read from the store so a stale copy can never move
    /// the index backwards.
    pub fn advance_multi_step_action_at(
        &self,
        action: &MultiStepAction,
        now: DateTime<Utc>,
    ) -> Result<Outcome<StepRecorded>> {
        let outcome = self.guarded(OperationKind::Record, || {
            self.require_own(action.space_id, "MultiStepAction", action.id)?;
            self.require_clocked_in()?;

            let mut fresh = self
                .store
                .get_multi_step_action(action.id)?
                .ok_or_else(|| CoreError::not_found("MultiStepAction", action.id))?;
            let step_index = fresh.advance()?;
            let points = i64::from(fresh.points_per_step);

            let entry = self.store.append_log(
                NewLogEntry::step(
                    fresh.space_id,
                    fresh.step_label(step_index),
                    points,
                    fresh.id,
                    step_index,
                )
                .at(now),
            )?;
            self.store.save_step_progress(&fresh)?;
            self.touch(now)?;

            self.emit(Some(Event::StepCompleted {
                space_id: fresh.space_id,
                multi_step_action_id: fresh.id,
                step_index,
                points,
                finished: fresh.is_complete(),
                at: now,
            }));
            Ok(Outcome::Applied((entry, fresh)))
        })?;
        self.attach_view(outcome, |(entry, action), view| StepRecorded {
            entry,
            action,
            view,
        })
    }

    pub fn log_waste(&self, category: &str, points: u32) -> Result<Outcome<WasteEntry>> {
        self.log_waste_at(category, points, Utc::now())
    }

    /// Log a waste entry. Allowed whether or not a session is running.
    pub fn log_waste_at(
        &self,
        category: &str,
        points: u32,
        now: DateTime<Utc>,
    ) -> Result<Outcome<WasteEntry>> {
        self.guarded(OperationKind::Record, || {
            let entry = self
                .store
                .add_waste(NewWasteEntry::new(self.space_id(), category, points).at(now))?;
            self.touch(now)?;
            self.emit(Some(Event::WasteLogged {
                space_id: entry.space_id,
                category: entry.category.clone(),
                points,
                at: entry.timestamp,
            }));
            Ok(Outcome::Applied(entry))
        })
    }

    // ── Notes ────────────────────────────────────────────────────────

    pub fn add_todo(&self, text: &str) -> Result<Todo> {
        let todo = self.store.add_todo(NewTodo {
            space_id: self.space_id(),
            text: text.to_string(),
        })?;
        self.touch(Utc::now())?;
        Ok(todo)
    }

    pub fn toggle_todo(&self, todo_id: Uuid) -> Result<Todo> {
        let mut todo = self
            .store
            .get_todo(todo_id)?
            .ok_or_else(|| CoreError::not_found("Todo", todo_id))?;
        self.require_own(todo.space_id, "Todo", todo.id)?;
        let now = Utc::now();
        todo.toggle(now);
        self.store.save_todo(&todo)?;
        self.touch(now)?;
        Ok(todo)
    }

    pub fn add_comment(&self, text: &str) -> Result<Comment> {
        let comment = self.store.add_comment(NewComment {
            space_id: self.space_id(),
            text: text.to_string(),
        })?;
        self.touch(comment.timestamp)?;
        Ok(comment)
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Run `op` holding the flag for `kind`; report `InFlight` if taken.
    fn guarded<T>(
        &self,
        kind: OperationKind,
        op: impl FnOnce() -> Result<Outcome<T>>,
    ) -> Result<Outcome<T>> {
        let Some(_token) = self.in_flight.try_begin(kind) else {
            tracing::warn!(?kind, "operation already in flight; ignoring");
            return Ok(Outcome::Ignored(Rejection::InFlight));
        };
        op()
    }

    /// Pair an applied result with a freshly computed view. Called after
    /// the guard is released so the view never reports itself as loading.
    fn attach_view<T, U>(
        &self,
        outcome: Outcome<T>,
        f: impl FnOnce(T, SessionView) -> U,
    ) -> Result<Outcome<U>> {
        match outcome {
            Outcome::Applied(value) => Ok(Outcome::Applied(f(value, self.view()?))),
            Outcome::Ignored(rejection) => Ok(Outcome::Ignored(rejection)),
        }
    }

    fn require_clocked_in(&self) -> Result<(), ValidationError> {
        if self.is_clocked_in() {
            Ok(())
        } else {
            Err(ValidationError::NotClockedIn {
                space_id: self.space_id(),
            })
        }
    }

    fn require_own(&self, owner: Uuid, kind: &'static str, id: Uuid) -> Result<(), ValidationError> {
        let space_id = self.space_id();
        if owner == space_id {
            Ok(())
        } else {
            Err(ValidationError::ForeignRecord { kind, id, space_id })
        }
    }

    fn touch(&self, now: DateTime<Utc>) -> Result<()> {
        let space = self
            .store
            .update_space(self.space_id(), &SpacePatch::touch(now))?;
        *self.space.borrow_mut() = space;
        Ok(())
    }

    fn emit(&self, event: Option<Event>) {
        if let Some(event) = event {
            self.events.borrow_mut().push(event);
        }
    }
}

/// The end time and minutes of the session started at `since`, when the
/// newest clock event in `logs` (newest first) is its clock-out.
fn logged_clock_out(logs: &[LogEntry], since: DateTime<Utc>) -> Option<(DateTime<Utc>, u64)> {
    let newest = logs
        .iter()
        .find(|e| matches!(e.event, LogEvent::ClockIn | LogEvent::ClockOut { .. }))?;
    match newest.event {
        LogEvent::ClockOut {
            clock_in_time,
            clock_out_time,
            minutes_clocked_in,
        } if clock_in_time == since => Some((clock_out_time, minutes_clocked_in)),
        _ => None,
    }
}

/// Repair a space that disagrees with its ledger.
///
/// - Clocked in, but the newest clock event is the clock-out of that very
///   session: the state write after the clock-out append was lost. Clear
///   the markers.
/// - Ledger minutes exceed the stored total: raise the total. A lower
///   ledger sum is left alone since explicit corrections may raise the
///   total without a ledger entry.
fn reconcile<S: Store>(
    store: &S,
    space: Space,
    now: DateTime<Utc>,
) -> Result<(Space, Option<Event>)> {
    let logs = store.list_logs(space.id)?;

    let stale_clock = match space.clock_marker() {
        ClockMarker::In { since } => logged_clock_out(&logs, since).is_some(),
        ClockMarker::Out => false,
    };
    let ledger_minutes = total_clocked_minutes(&logs, space.id);
    let raise_total = ledger_minutes > space.total_clocked_in_time;

    if !stale_clock && !raise_total {
        return Ok((space, None));
    }

    let mut patch = SpacePatch::default();
    if stale_clock {
        patch.clock = Some(ClockMarker::Out);
    }
    if raise_total {
        patch.total_clocked_in_time = Some(ledger_minutes);
    }
    tracing::warn!(
        space_id = %space.id,
        stored_minutes = space.total_clocked_in_time,
        ledger_minutes,
        stale_clock,
        "space disagrees with its ledger; repairing"
    );
    let previous = space.total_clocked_in_time;
    let repaired = store.update_space(space.id, &patch)?;
    let event = Event::SpaceReconciled {
        space_id: repaired.id,
        previous_total_minutes: previous,
        total_minutes: repaired.total_clocked_in_time,
        cleared_stale_clock: stale_clock,
        at: now,
    };
    Ok((repaired, Some(event)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ClockState;
    use crate::model::{LogKind, NewAction, NewMultiStepAction, NewSpace};
    use crate::storage::{CatalogRepository, Database, LogRepository, SpaceRepository};
    use chrono::Duration;

    fn controller() -> SessionController<Database> {
        let db = Database::open_memory().unwrap();
        let space = db.create_space(NewSpace::named("Garage")).unwrap();
        SessionController::load(db, space.id, EngineConfig::default()).unwrap()
    }

    fn sweep(ctl: &SessionController<Database>, points: u32) -> Action {
        ctl.store()
            .create_action(NewAction {
                space_id: ctl.space_id(),
                name: "Sweep".into(),
                points,
                description: String::new(),
            })
            .unwrap()
    }

    fn clock_entries(ctl: &SessionController<Database>) -> Vec<LogKind> {
        ctl.store()
            .list_logs(ctl.space_id())
            .unwrap()
            .iter()
            .map(|e| e.kind())
            .collect()
    }

    #[test]
    fn clock_out_after_125_seconds_adds_two_minutes() {
        let ctl = controller();
        let t0 = Utc::now();
        assert!(ctl.clock_in_at(t0).unwrap().is_applied());
        let view = ctl
            .clock_out_at(t0 + Duration::seconds(125))
            .unwrap()
            .applied()
            .unwrap();
        assert_eq!(view.space.total_clocked_in_time, 2);
        assert!(!view.is_clocked_in);
        assert!(view.clock_in_start_time.is_none());

        let logs = ctl.store().list_logs(ctl.space_id()).unwrap();
        match logs[0].event {
            LogEvent::ClockOut {
                minutes_clocked_in,
                clock_in_time,
                ..
            } => {
                assert_eq!(minutes_clocked_in, 2);
                assert_eq!(clock_in_time, t0);
            }
            other => panic!("Expected ClockOut, got {other:?}"),
        }
    }

    #[test]
    fn clock_out_while_out_writes_nothing() {
        let ctl = controller();
        let before = ctl.store().get_space(ctl.space_id()).unwrap().unwrap();
        let outcome = ctl.clock_out().unwrap();
        assert_eq!(outcome.rejection(), Some(Rejection::NotClockedIn));
        assert!(clock_entries(&ctl).is_empty());
        let after = ctl.store().get_space(ctl.space_id()).unwrap().unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn double_clock_in_appends_once() {
        let ctl = controller();
        let t0 = Utc::now();
        assert!(ctl.clock_in_at(t0).unwrap().is_applied());
        let second = ctl.clock_in_at(t0 + Duration::seconds(1)).unwrap();
        assert_eq!(second.rejection(), Some(Rejection::AlreadyClockedIn));
        assert_eq!(clock_entries(&ctl), vec![LogKind::ClockIn]);
        assert_eq!(ctl.clock_in_start_time(), Some(t0));
    }

    #[test]
    fn clock_ops_rejected_while_in_flight() {
        let ctl = controller();
        let token = ctl.in_flight().try_begin(OperationKind::Clock).unwrap();
        assert!(ctl.is_clock_loading());
        let outcome = ctl.clock_in().unwrap();
        assert_eq!(outcome.rejection(), Some(Rejection::InFlight));
        assert!(clock_entries(&ctl).is_empty());
        drop(token);
        assert!(!ctl.is_clock_loading());
        assert!(ctl.clock_in().unwrap().is_applied());
    }

    #[test]
    fn sub_minute_session_leaves_total_alone() {
        let ctl = controller();
        let t0 = Utc::now();
        ctl.clock_in_at(t0).unwrap();
        let view = ctl
            .clock_out_at(t0 + Duration::seconds(59))
            .unwrap()
            .applied()
            .unwrap();
        assert_eq!(view.space.total_clocked_in_time, 0);
        assert_eq!(view.current_session_elapsed_time, 59);
        assert_eq!(
            clock_entries(&ctl),
            vec![LogKind::ClockOut, LogKind::ClockIn]
        );
    }

    #[test]
    fn record_action_multiplies_points() {
        let ctl = controller();
        let action = sweep(&ctl, 10);
        ctl.clock_in().unwrap();
        let recorded = ctl.record_action(&action, 5).unwrap().applied().unwrap();
        assert_eq!(recorded.entry.points, 50);
        assert_eq!(recorded.entry.kind(), LogKind::Action);
        assert_eq!(recorded.entry.action_name, "Sweep x5");
        assert_eq!(recorded.view.scoreboard.total_points, 50);
        assert_eq!(recorded.view.scoreboard.session_points, 50);
    }

    #[test]
    fn record_action_requires_clock_in() {
        let ctl = controller();
        let action = sweep(&ctl, 10);
        let err = ctl.record_action(&action, 1).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::NotClockedIn { .. })
        ));
        assert!(clock_entries(&ctl).is_empty());
    }

    #[test]
    fn record_action_rejects_unknown_multiplier() {
        let ctl = controller();
        let action = sweep(&ctl, 10);
        ctl.clock_in().unwrap();
        let err = ctl.record_action(&action, 3).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::InvalidMultiplier { multiplier: 3, .. })
        ));
    }

    #[test]
    fn three_step_action_completes() {
        let ctl = controller();
        let msa = ctl
            .store()
            .create_multi_step_action(NewMultiStepAction {
                space_id: ctl.space_id(),
                name: "5S".into(),
                points_per_step: 7,
                step_names: vec!["Sort".into(), "Set".into(), "Shine".into()],
            })
            .unwrap();
        ctl.clock_in().unwrap();

        let mut latest = msa.clone();
        for expected in 0..3 {
            let (entry, progressed) = ctl
                .advance_multi_step_action(&msa)
                .unwrap()
                .applied()
                .map(|s| (s.entry, s.action))
                .unwrap();
            assert_eq!(entry.points, 7);
            assert!(matches!(
                entry.event,
                LogEvent::MultiStepAction { step_index, .. } if step_index == expected
            ));
            latest = progressed;
        }
        assert_eq!(latest.current_step_index, 3);
        assert!(latest.steps.iter().all(|s| s.completed));

        let err = ctl.advance_multi_step_action(&msa).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::MultiStepComplete { .. })
        ));
        let steps = ctl
            .store()
            .list_logs(ctl.space_id())
            .unwrap()
            .into_iter()
            .filter(|e| e.kind() == LogKind::MultiStepAction)
            .count();
        assert_eq!(steps, 3);
    }

    #[test]
    fn reload_resumes_elapsed_time() {
        let db = Database::open_memory().unwrap();
        let space = db.create_space(NewSpace::named("Desk")).unwrap();
        let start = Utc::now() - Duration::seconds(60);
        db.append_log(NewLogEntry::clock_in(space.id, start)).unwrap();
        db.update_space(
            space.id,
            &SpacePatch::clock(ClockMarker::In { since: start }, start),
        )
        .unwrap();

        let ctl = SessionController::load(db, space.id, EngineConfig::default()).unwrap();
        assert!(ctl.is_clocked_in());
        assert!(ctl.current_session_elapsed_secs() >= 60);
        assert!(matches!(
            ctl.drain_events().as_slice(),
            [Event::SessionResumed { .. }]
        ));
    }

    #[test]
    fn tick_only_moves_while_clocked_in() {
        let ctl = controller();
        let t0 = Utc::now();
        assert_eq!(ctl.tick_at(t0), None);
        ctl.clock_in_at(t0).unwrap();
        assert_eq!(ctl.tick_at(t0 + Duration::seconds(3)), Some(3));
        ctl.clock_out_at(t0 + Duration::seconds(4)).unwrap();
        assert_eq!(ctl.tick_at(t0 + Duration::seconds(20)), None);
        assert_eq!(ctl.current_session_elapsed_secs(), 4);
        assert_eq!(ctl.view().unwrap().state, ClockState::ClockedOut);
    }

    #[test]
    fn events_follow_operations() {
        let ctl = controller();
        let action = sweep(&ctl, 2);
        let t0 = Utc::now();
        ctl.clock_in_at(t0).unwrap();
        ctl.record_action_at(&action, 2, t0 + Duration::seconds(1))
            .unwrap();
        ctl.clock_out_at(t0 + Duration::seconds(61)).unwrap();
        let events = ctl.drain_events();
        assert!(matches!(
            events.as_slice(),
            [
                Event::ClockedIn { .. },
                Event::ActionRecorded { points: 4, .. },
                Event::ClockedOut {
                    minutes_clocked_in: 1,
                    ..
                },
            ]
        ));
        assert!(ctl.drain_events().is_empty());
    }

    #[test]
    fn notes_touch_date_modified() {
        let ctl = controller();
        let before = ctl.space().date_modified;
        let todo = ctl.add_todo("Label the drawers").unwrap();
        let toggled = ctl.toggle_todo(todo.id).unwrap();
        assert!(toggled.completed);
        ctl.add_comment("Floor is clear").unwrap();
        assert!(ctl.space().date_modified >= before);
    }

    #[test]
    fn foreign_action_is_rejected() {
        let ctl = controller();
        let other = ctl
            .store()
            .create_space(NewSpace::named("Elsewhere"))
            .unwrap();
        let action = ctl
            .store()
            .create_action(NewAction {
                space_id: other.id,
                name: "Mop".into(),
                points: 1,
                description: String::new(),
            })
            .unwrap();
        ctl.clock_in().unwrap();
        let err = ctl.record_action(&action, 1).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::ForeignRecord { kind: "Action", .. })
        ));
    }
}
