use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::ClockState;
use crate::model::{LogEntry, MultiStepAction, Space};
use crate::scoring::Scoreboard;

/// Why an operation was skipped without touching storage.
///
/// Hosts are expected to swallow these quietly (at most disable a button).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    AlreadyClockedIn,
    NotClockedIn,
    /// Another operation of the same kind is still running.
    InFlight,
}

/// Result of a guarded operation that did not fail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "value", rename_all = "snake_case")]
pub enum Outcome<T> {
    Applied(T),
    Ignored(Rejection),
}

impl<T> Outcome<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied(_))
    }

    pub fn applied(self) -> Option<T> {
        match self {
            Outcome::Applied(value) => Some(value),
            Outcome::Ignored(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            Outcome::Applied(_) => None,
            Outcome::Ignored(rejection) => Some(*rejection),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Applied(value) => Outcome::Applied(f(value)),
            Outcome::Ignored(rejection) => Outcome::Ignored(rejection),
        }
    }
}

/// Everything a host renders for the current space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub space: Space,
    pub state: ClockState,
    pub is_clocked_in: bool,
    pub clock_in_start_time: Option<DateTime<Utc>>,
    pub current_session_elapsed_time: u64,
    pub is_clock_loading: bool,
    pub scoreboard: Scoreboard,
}

/// A ledger write together with the refreshed view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recorded {
    pub entry: LogEntry,
    pub view: SessionView,
}

/// A completed checklist step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecorded {
    pub entry: LogEntry,
    pub action: MultiStepAction,
    pub view: SessionView,
}
