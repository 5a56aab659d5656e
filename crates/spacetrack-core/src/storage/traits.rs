//! Storage repository traits
//!
//! The engine only reaches persistence through these traits, so the
//! session controller can run against SQLite or against a test double.
//! Every method stamps missing timestamps with the backend's own clock.

use uuid::Uuid;

use crate::error::Result;
use crate::model::{
    Action, Comment, LogEntry, MultiStepAction, NewAction, NewComment, NewLogEntry,
    NewMultiStepAction, NewSpace, NewTodo, NewWasteEntry, Space, SpacePatch, Todo, WasteEntry,
};

/// Space records and their clock/aggregate fields.
pub trait SpaceRepository {
    /// Create a new space (clocked out, zero minutes)
    fn create_space(&self, new: NewSpace) -> Result<Space>;

    /// Find space by ID
    fn get_space(&self, id: Uuid) -> Result<Option<Space>>;

    /// Apply a partial update and return the stored result.
    /// Fails with `NotFound` for an unknown id.
    fn update_space(&self, id: Uuid, patch: &SpacePatch) -> Result<Space>;

    /// All spaces, most recently modified first
    fn list_spaces(&self) -> Result<Vec<Space>>;
}

/// The append-only ledger. There is deliberately no update or delete.
pub trait LogRepository {
    /// Assign identity (and a timestamp if missing) and store durably
    fn append_log(&self, entry: NewLogEntry) -> Result<LogEntry>;

    /// Entries for a space, newest first; equal timestamps keep
    /// reverse insertion order
    fn list_logs(&self, space_id: Uuid) -> Result<Vec<LogEntry>>;
}

/// Actions and multi-step actions.
pub trait CatalogRepository {
    fn create_action(&self, new: NewAction) -> Result<Action>;

    fn get_action(&self, id: Uuid) -> Result<Option<Action>>;

    fn list_actions(&self, space_id: Uuid) -> Result<Vec<Action>>;

    fn create_multi_step_action(&self, new: NewMultiStepAction) -> Result<MultiStepAction>;

    fn get_multi_step_action(&self, id: Uuid) -> Result<Option<MultiStepAction>>;

    fn list_multi_step_actions(&self, space_id: Uuid) -> Result<Vec<MultiStepAction>>;

    /// Persist step completion flags and `current_step_index`
    fn save_step_progress(&self, action: &MultiStepAction) -> Result<()>;
}

pub trait WasteRepository {
    fn add_waste(&self, new: NewWasteEntry) -> Result<WasteEntry>;

    /// Waste entries for a space, newest first
    fn list_waste(&self, space_id: Uuid) -> Result<Vec<WasteEntry>>;
}

/// To-dos and comments.
pub trait NoteRepository {
    fn add_todo(&self, new: NewTodo) -> Result<Todo>;

    fn get_todo(&self, id: Uuid) -> Result<Option<Todo>>;

    fn save_todo(&self, todo: &Todo) -> Result<()>;

    /// To-dos for a space in creation order
    fn list_todos(&self, space_id: Uuid) -> Result<Vec<Todo>>;

    fn add_comment(&self, new: NewComment) -> Result<Comment>;

    /// Comments for a space, newest first
    fn list_comments(&self, space_id: Uuid) -> Result<Vec<Comment>>;
}

/// Everything the session controller needs from persistence.
pub trait Store:
    SpaceRepository + LogRepository + CatalogRepository + WasteRepository + NoteRepository
{
}

impl<T> Store for T where
    T: SpaceRepository + LogRepository + CatalogRepository + WasteRepository + NoteRepository
{
}
