use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// A logged instance of a non-value-adding activity.
///
/// Waste points are subtracted from the net score shown to the user and
/// never from the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WasteEntry {
    pub id: Uuid,
    pub space_id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Category label, e.g. "Waiting" or "Motion".
    #[serde(rename = "type")]
    pub category: String,
    pub points: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWasteEntry {
    pub space_id: Uuid,
    #[serde(rename = "type")]
    pub category: String,
    pub points: u32,
    /// Defaults to the repository's "now".
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl NewWasteEntry {
    pub fn new(space_id: Uuid, category: impl Into<String>, points: u32) -> Self {
        Self {
            space_id,
            category: category.into(),
            points,
            timestamp: None,
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        super::require_text("type", &self.category)
    }

    pub fn into_entry(self, now: DateTime<Utc>) -> WasteEntry {
        WasteEntry {
            id: Uuid::new_v4(),
            space_id: self.space_id,
            timestamp: self.timestamp.unwrap_or(now),
            category: self.category.trim().to_string(),
            points: self.points,
        }
    }
}
