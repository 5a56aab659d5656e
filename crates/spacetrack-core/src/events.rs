use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::ClockState;

/// Every state change in the engine produces an Event.
/// The host drains them after each operation to drive notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    ClockedIn {
        space_id: Uuid,
        at: DateTime<Utc>,
    },
    ClockedOut {
        space_id: Uuid,
        clock_in_time: DateTime<Utc>,
        minutes_clocked_in: u64,
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    /// A clocked-in session was picked up from persisted markers.
    SessionResumed {
        space_id: Uuid,
        clock_in_start_time: DateTime<Utc>,
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    ActionRecorded {
        space_id: Uuid,
        action_id: Uuid,
        multiplier: u32,
        points: i64,
        at: DateTime<Utc>,
    },
    StepCompleted {
        space_id: Uuid,
        multi_step_action_id: Uuid,
        step_index: usize,
        points: i64,
        finished: bool,
        at: DateTime<Utc>,
    },
    WasteLogged {
        space_id: Uuid,
        category: String,
        points: u32,
        at: DateTime<Utc>,
    },
    /// Load-time repair of a space that disagreed with its ledger.
    SpaceReconciled {
        space_id: Uuid,
        previous_total_minutes: u64,
        total_minutes: u64,
        cleared_stale_clock: bool,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        space_id: Uuid,
        state: ClockState,
        clock_in_start_time: Option<DateTime<Utc>>,
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
}
