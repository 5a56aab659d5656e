use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// A tracked process-improvement effort.
///
/// `is_clocked_in` and `clock_in_start_time` always move together: the
/// start time is present exactly when the space is clocked in. The only
/// way to change them through a repository is [`SpacePatch::clock`],
/// which takes a [`ClockMarker`] and so cannot split the pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Space {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub goal: Option<String>,
    /// Opaque image references; the engine never reads them.
    pub before_image: Option<String>,
    pub after_image: Option<String>,
    pub date_created: DateTime<Utc>,
    pub date_modified: DateTime<Utc>,
    /// Accumulated clocked time in whole minutes.
    pub total_clocked_in_time: u64,
    pub is_clocked_in: bool,
    pub clock_in_start_time: Option<DateTime<Utc>>,
}

impl Space {
    pub fn clock_marker(&self) -> ClockMarker {
        match (self.is_clocked_in, self.clock_in_start_time) {
            (true, Some(start)) => ClockMarker::In { since: start },
            _ => ClockMarker::Out,
        }
    }

    /// True when the clock fields agree with each other.
    pub fn clock_fields_consistent(&self) -> bool {
        self.is_clocked_in == self.clock_in_start_time.is_some()
    }

    /// Apply a patch in memory. Repositories use this so every backend
    /// interprets a patch the same way.
    pub fn apply(&mut self, patch: &SpacePatch, now: DateTime<Utc>) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(goal) = &patch.goal {
            self.goal = goal.clone();
        }
        if let Some(before) = &patch.before_image {
            self.before_image = before.clone();
        }
        if let Some(after) = &patch.after_image {
            self.after_image = after.clone();
        }
        if let Some(total) = patch.total_clocked_in_time {
            self.total_clocked_in_time = total;
        }
        if let Some(marker) = patch.clock {
            self.set_clock(marker);
        }
        self.date_modified = patch.date_modified.unwrap_or(now);
    }

    fn set_clock(&mut self, marker: ClockMarker) {
        match marker {
            ClockMarker::In { since } => {
                self.is_clocked_in = true;
                self.clock_in_start_time = Some(since);
            }
            ClockMarker::Out => {
                self.is_clocked_in = false;
                self.clock_in_start_time = None;
            }
        }
    }
}

/// The persisted half of the clock state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ClockMarker {
    In { since: DateTime<Utc> },
    Out,
}

/// Fields needed to create a space.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSpace {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub before_image: Option<String>,
    #[serde(default)]
    pub after_image: Option<String>,
}

impl NewSpace {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        super::require_text("name", &self.name)
    }

    /// Materialize a clocked-out space with zero accumulated time.
    pub fn into_space(self, now: DateTime<Utc>) -> Space {
        Space {
            id: Uuid::new_v4(),
            name: self.name.trim().to_string(),
            description: self.description,
            goal: self.goal,
            before_image: self.before_image,
            after_image: self.after_image,
            date_created: now,
            date_modified: now,
            total_clocked_in_time: 0,
            is_clocked_in: false,
            clock_in_start_time: None,
        }
    }
}

/// Partial update for a space. `None` leaves a field alone; the nested
/// `Option` on nullable fields distinguishes "clear" from "keep".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpacePatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub goal: Option<Option<String>>,
    pub before_image: Option<Option<String>>,
    pub after_image: Option<Option<String>>,
    pub total_clocked_in_time: Option<u64>,
    pub clock: Option<ClockMarker>,
    /// Defaults to the repository's notion of "now".
    pub date_modified: Option<DateTime<Utc>>,
}

impl SpacePatch {
    /// A patch that only bumps `date_modified`.
    pub fn touch(at: DateTime<Utc>) -> Self {
        Self {
            date_modified: Some(at),
            ..Self::default()
        }
    }

    pub fn clock(marker: ClockMarker, at: DateTime<Utc>) -> Self {
        Self {
            clock: Some(marker),
            date_modified: Some(at),
            ..Self::default()
        }
    }

    pub fn with_total_clocked_in_time(mut self, minutes: u64) -> Self {
        self.total_clocked_in_time = Some(minutes);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn new_space_starts_clocked_out() {
        let now = Utc::now();
        let space = NewSpace::named("  Garage  ").into_space(now);
        assert_eq!(space.name, "Garage");
        assert!(!space.is_clocked_in);
        assert!(space.clock_in_start_time.is_none());
        assert_eq!(space.total_clocked_in_time, 0);
        assert_eq!(space.date_created, space.date_modified);
    }

    #[test]
    fn blank_name_is_rejected() {
        assert!(NewSpace::named("   ").validate().is_err());
        assert!(NewSpace::named("Kitchen").validate().is_ok());
    }

    #[test]
    fn clock_patch_sets_both_fields() {
        let now = Utc::now();
        let mut space = NewSpace::named("Desk").into_space(now);
        space.apply(&SpacePatch::clock(ClockMarker::In { since: now }, now), now);
        assert!(space.is_clocked_in);
        assert_eq!(space.clock_in_start_time, Some(now));
        assert!(space.clock_fields_consistent());

        let later = now + Duration::minutes(3);
        space.apply(&SpacePatch::clock(ClockMarker::Out, later), later);
        assert!(!space.is_clocked_in);
        assert!(space.clock_in_start_time.is_none());
        assert_eq!(space.date_modified, later);
    }

    #[test]
    fn nested_option_clears_field() {
        let now = Utc::now();
        let mut space = NewSpace {
            name: "Shed".into(),
            goal: Some("Tidy".into()),
            ..NewSpace::default()
        }
        .into_space(now);
        let patch = SpacePatch {
            goal: Some(None),
            ..SpacePatch::default()
        };
        space.apply(&patch, now);
        assert!(space.goal.is_none());
    }

    #[test]
    fn inconsistent_fields_read_as_clocked_out() {
        let now = Utc::now();
        let mut space = NewSpace::named("Loft").into_space(now);
        space.is_clocked_in = true;
        assert!(!space.clock_fields_consistent());
        assert_eq!(space.clock_marker(), ClockMarker::Out);
    }
}
