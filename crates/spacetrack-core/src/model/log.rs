use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One immutable ledger record.
///
/// Entries are never edited; a correction is a new entry with
/// compensating points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: Uuid,
    pub space_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub action_name: String,
    /// Zero for clock events.
    pub points: i64,
    #[serde(flatten)]
    pub event: LogEvent,
}

impl LogEntry {
    pub fn kind(&self) -> LogKind {
        self.event.kind()
    }

    /// Whether this entry contributes to AP totals.
    pub fn is_scoring(&self) -> bool {
        self.event.kind().is_scoring()
    }
}

/// What happened, with the fields that only make sense for that kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LogEvent {
    Action,
    #[serde(rename_all = "camelCase")]
    MultiStepAction {
        multi_step_action_id: Uuid,
        step_index: usize,
    },
    ClockIn,
    #[serde(rename_all = "camelCase")]
    ClockOut {
        clock_in_time: DateTime<Utc>,
        clock_out_time: DateTime<Utc>,
        minutes_clocked_in: u64,
    },
}

impl LogEvent {
    pub fn kind(&self) -> LogKind {
        match self {
            LogEvent::Action => LogKind::Action,
            LogEvent::MultiStepAction { .. } => LogKind::MultiStepAction,
            LogEvent::ClockIn => LogKind::ClockIn,
            LogEvent::ClockOut { .. } => LogKind::ClockOut,
        }
    }
}

/// Flat discriminant of [`LogEvent`], used as the storage column value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LogKind {
    Action,
    MultiStepAction,
    ClockIn,
    ClockOut,
}

impl LogKind {
    pub fn is_scoring(self) -> bool {
        matches!(self, LogKind::Action | LogKind::MultiStepAction)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogKind::Action => "action",
            LogKind::MultiStepAction => "multiStepAction",
            LogKind::ClockIn => "clockIn",
            LogKind::ClockOut => "clockOut",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "action" => Some(LogKind::Action),
            "multiStepAction" => Some(LogKind::MultiStepAction),
            "clockIn" => Some(LogKind::ClockIn),
            "clockOut" => Some(LogKind::ClockOut),
            _ => None,
        }
    }
}

/// A ledger entry before the ledger has assigned its identity.
///
/// `timestamp` is optional; the ledger stamps the entry with its own
/// clock when it is missing.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLogEntry {
    pub space_id: Uuid,
    pub action_name: String,
    pub points: i64,
    pub event: LogEvent,
    pub timestamp: Option<DateTime<Utc>>,
}

impl NewLogEntry {
    pub fn clock_in(space_id: Uuid, at: DateTime<Utc>) -> Self {
        Self {
            space_id,
            action_name: "Clock In".to_string(),
            points: 0,
            event: LogEvent::ClockIn,
            timestamp: Some(at),
        }
    }

    pub fn clock_out(
        space_id: Uuid,
        clock_in_time: DateTime<Utc>,
        clock_out_time: DateTime<Utc>,
        minutes_clocked_in: u64,
    ) -> Self {
        Self {
            space_id,
            action_name: "Clock Out".to_string(),
            points: 0,
            event: LogEvent::ClockOut {
                clock_in_time,
                clock_out_time,
                minutes_clocked_in,
            },
            timestamp: Some(clock_out_time),
        }
    }

    pub fn action(space_id: Uuid, action_name: impl Into<String>, points: i64) -> Self {
        Self {
            space_id,
            action_name: action_name.into(),
            points,
            event: LogEvent::Action,
            timestamp: None,
        }
    }

    pub fn step(
        space_id: Uuid,
        action_name: impl Into<String>,
        points: i64,
        multi_step_action_id: Uuid,
        step_index: usize,
    ) -> Self {
        Self {
            space_id,
            action_name: action_name.into(),
            points,
            event: LogEvent::MultiStepAction {
                multi_step_action_id,
                step_index,
            },
            timestamp: None,
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Assign identity, falling back to `now` for the timestamp.
    pub fn into_entry(self, now: DateTime<Utc>) -> LogEntry {
        LogEntry {
            id: Uuid::new_v4(),
            space_id: self.space_id,
            timestamp: self.timestamp.unwrap_or(now),
            action_name: self.action_name,
            points: self.points,
            event: self.event,
        }
    }
}
