//! To-dos and comments. Neither affects scoring; both touch the owning
//! space's `date_modified`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: Uuid,
    pub space_id: Uuid,
    pub text: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    /// Present iff `completed`.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Todo {
    pub fn toggle(&mut self, now: DateTime<Utc>) {
        self.completed = !self.completed;
        self.completed_at = self.completed.then_some(now);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTodo {
    pub space_id: Uuid,
    pub text: String,
}

impl NewTodo {
    pub fn validate(&self) -> Result<(), ValidationError> {
        super::require_text("text", &self.text)
    }

    pub fn into_todo(self, now: DateTime<Utc>) -> Todo {
        Todo {
            id: Uuid::new_v4(),
            space_id: self.space_id,
            text: self.text.trim().to_string(),
            completed: false,
            created_at: now,
            completed_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub space_id: Uuid,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub space_id: Uuid,
    pub text: String,
}

impl NewComment {
    pub fn validate(&self) -> Result<(), ValidationError> {
        super::require_text("text", &self.text)
    }

    pub fn into_comment(self, now: DateTime<Utc>) -> Comment {
        Comment {
            id: Uuid::new_v4(),
            space_id: self.space_id,
            text: self.text.trim().to_string(),
            timestamp: now,
        }
    }
}
