//! Action point scoring.
//!
//! Every number here is derived from the ledger (and the waste log) at
//! read time. Nothing is cached in a persisted field, so a total can never
//! drift from the history it summarizes.
//!
//! | Figure | Definition |
//! |--------|------------|
//! | total points | Σ points of `action` + `multiStepAction` entries |
//! | session points | same, with `timestamp >= session_start` |
//! | AP/hour | session points / (elapsed secs / 3600), 0 when elapsed is 0 |
//! | waste points | Σ waste entry points |
//! | net points | total points − waste points |
//!
//! All functions take a `space_id` and skip records of other spaces, so a
//! caller may hand in a mixed slice.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{LogEntry, LogEvent, WasteEntry};

const SECS_PER_HOUR: f64 = 3600.0;

fn scoring_entries(entries: &[LogEntry], space_id: Uuid) -> impl Iterator<Item = &LogEntry> {
    entries
        .iter()
        .filter(move |e| e.space_id == space_id && e.is_scoring())
}

pub fn total_points(entries: &[LogEntry], space_id: Uuid) -> i64 {
    scoring_entries(entries, space_id).map(|e| e.points).sum()
}

pub fn session_points(
    entries: &[LogEntry],
    space_id: Uuid,
    session_start: DateTime<Utc>,
) -> i64 {
    scoring_entries(entries, space_id)
        .filter(|e| e.timestamp >= session_start)
        .map(|e| e.points)
        .sum()
}

/// Points per hour of session time. Zero elapsed time yields 0.
pub fn ap_per_hour(session_points: i64, elapsed_secs: u64) -> f64 {
    if elapsed_secs == 0 {
        return 0.0;
    }
    session_points as f64 / (elapsed_secs as f64 / SECS_PER_HOUR)
}

pub fn total_waste_points(waste: &[WasteEntry], space_id: Uuid) -> u64 {
    waste
        .iter()
        .filter(|w| w.space_id == space_id)
        .map(|w| u64::from(w.points))
        .sum()
}

/// Clocked minutes according to the ledger's clock-out entries.
///
/// A session is keyed by its `clock_in_time`; a retried clock-out of the
/// same session is counted once, at its largest recorded length.
pub fn total_clocked_minutes(entries: &[LogEntry], space_id: Uuid) -> u64 {
    let mut sessions: BTreeMap<DateTime<Utc>, u64> = BTreeMap::new();
    for entry in entries.iter().filter(|e| e.space_id == space_id) {
        if let LogEvent::ClockOut {
            clock_in_time,
            minutes_clocked_in,
            ..
        } = entry.event
        {
            let minutes = sessions.entry(clock_in_time).or_insert(0);
            *minutes = (*minutes).max(minutes_clocked_in);
        }
    }
    sessions.values().sum()
}

/// Every derived figure the host displays for one space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scoreboard {
    pub total_points: i64,
    pub session_points: i64,
    pub ap_per_hour: f64,
    pub total_waste_points: u64,
    pub net_points: i64,
    pub ledger_clocked_minutes: u64,
    pub scoring_entries: usize,
}

impl Scoreboard {
    /// Derive the board. `session_start` is `None` when no session has been
    /// observed since the view was initialized; session figures are 0 then.
    pub fn compute(
        space_id: Uuid,
        entries: &[LogEntry],
        waste: &[WasteEntry],
        session_start: Option<DateTime<Utc>>,
        elapsed_secs: u64,
    ) -> Self {
        let total = total_points(entries, space_id);
        let session = session_start
            .map(|start| session_points(entries, space_id, start))
            .unwrap_or(0);
        let waste_total = total_waste_points(waste, space_id);
        Self {
            total_points: total,
            session_points: session,
            ap_per_hour: ap_per_hour(session, elapsed_secs),
            total_waste_points: waste_total,
            net_points: total.saturating_sub(i64::try_from(waste_total).unwrap_or(i64::MAX)),
            ledger_clocked_minutes: total_clocked_minutes(entries, space_id),
            scoring_entries: scoring_entries(entries, space_id).count(),
        }
    }
}
