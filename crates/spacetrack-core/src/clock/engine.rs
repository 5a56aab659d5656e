//! Clock engine implementation.
//!
//! The clock engine is a wall-clock-based state machine. It does not use
//! internal threads - the host is responsible for calling `tick()` once per
//! second while a session is running.
//!
//! ## State Transitions
//!
//! ```text
//! ClockedOut -> ClockedIn -> ClockedOut
//! ```
//!
//! Nothing here survives a restart on its own. The engine is rebuilt from
//! the persisted [`Space`] with [`ClockEngine::restore`], which picks up an
//! interrupted session from its stored start time.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = ClockEngine::restore(&space, Utc::now());
//! engine.clock_in(Utc::now());
//! // Once per second:
//! engine.tick(Utc::now());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::events::Event;
use crate::model::{ClockMarker, Space};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockState {
    ClockedOut,
    ClockedIn,
}

/// Core clock engine for one space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockEngine {
    space_id: Uuid,
    state: ClockState,
    started_at: Option<DateTime<Utc>>,
    /// Seconds shown to the user. Frozen (not reset) on clock-out.
    elapsed_secs: u64,
}

impl ClockEngine {
    /// A fresh, clocked-out engine.
    pub fn new(space_id: Uuid) -> Self {
        Self {
            space_id,
            state: ClockState::ClockedOut,
            started_at: None,
            elapsed_secs: 0,
        }
    }

    /// Rebuild the engine from persisted clock markers.
    ///
    /// When the space was clocked in, the elapsed time is computed
    /// immediately from the stored start so the display never restarts
    /// from zero.
    pub fn restore(space: &Space, now: DateTime<Utc>) -> Self {
        let mut engine = Self::new(space.id);
        if let ClockMarker::In { since } = space.clock_marker() {
            engine.state = ClockState::ClockedIn;
            engine.started_at = Some(since);
            engine.elapsed_secs = elapsed_secs(since, now);
        }
        engine
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn space_id(&self) -> Uuid {
        self.space_id
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn is_clocked_in(&self) -> bool {
        self.state == ClockState::ClockedIn
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self, at: DateTime<Utc>) -> Event {
        Event::StateSnapshot {
            space_id: self.space_id,
            state: self.state,
            clock_in_start_time: self.started_at,
            elapsed_secs: self.elapsed_secs,
            at,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Returns `None` when already clocked in.
    pub fn clock_in(&mut self, now: DateTime<Utc>) -> Option<Event> {
        match self.state {
            ClockState::ClockedIn => None,
            ClockState::ClockedOut => {
                self.state = ClockState::ClockedIn;
                self.started_at = Some(now);
                self.elapsed_secs = 0;
                Some(Event::ClockedIn {
                    space_id: self.space_id,
                    at: now,
                })
            }
        }
    }

    /// Returns `None` when not clocked in.
    pub fn clock_out(&mut self, now: DateTime<Utc>) -> Option<Event> {
        let started_at = match (self.state, self.started_at) {
            (ClockState::ClockedIn, Some(start)) => start,
            _ => return None,
        };
        self.elapsed_secs = elapsed_secs(started_at, now);
        self.state = ClockState::ClockedOut;
        self.started_at = None;
        Some(Event::ClockedOut {
            space_id: self.space_id,
            clock_in_time: started_at,
            minutes_clocked_in: whole_minutes(started_at, now),
            elapsed_secs: self.elapsed_secs,
            at: now,
        })
    }

    /// Call periodically. Returns the refreshed elapsed seconds while
    /// clocked in, `None` otherwise.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<u64> {
        match (self.state, self.started_at) {
            (ClockState::ClockedIn, Some(start)) => {
                self.elapsed_secs = elapsed_secs(start, now);
                Some(self.elapsed_secs)
            }
            _ => None,
        }
    }
}

/// Whole seconds from `start` to `now`, clamped at zero.
pub fn elapsed_secs(start: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    (now - start).num_seconds().max(0) as u64
}

/// Whole minutes from `start` to `end`, rounded down and clamped at zero.
pub fn whole_minutes(start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    elapsed_secs(start, end) / 60
}
