//! Domain records owned by a [`Space`].
//!
//! A Space is the aggregate root: every other record carries the
//! `space_id` of exactly one Space, and any mutation that touches one of
//! them bumps the Space's `date_modified`.

mod catalog;
mod log;
mod notes;
mod space;
mod waste;

pub use catalog::{Action, ActionStep, MultiStepAction, NewAction, NewMultiStepAction};
pub use log::{LogEntry, LogEvent, LogKind, NewLogEntry};
pub use notes::{Comment, NewComment, NewTodo, Todo};
pub use space::{ClockMarker, NewSpace, Space, SpacePatch};
pub use waste::{NewWasteEntry, WasteEntry};

use crate::error::ValidationError;

/// Reject blank user-entered labels.
pub(crate) fn require_text(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: "must not be empty".to_string(),
        });
    }
    Ok(())
}
