//! # Spacetrack Core Library
//!
//! Core logic for tracking work done in a physical space. A space is clocked
//! in and out; while clocked in, completed actions and checklist steps earn
//! Action Points (AP) recorded in an append-only ledger.
//!
//! ## Architecture
//!
//! - **Clock Engine**: A wall-clock state machine that the host ticks
//!   periodically to refresh the elapsed-time display
//! - **Scoring**: Pure functions deriving totals and AP/hour from the ledger
//! - **Storage**: SQLite persistence behind repository traits, TOML config
//! - **Session**: The controller that orders ledger and space writes
//!
//! ## Key Components
//!
//! - [`SessionController`]: Clock-in/out and recording for one space
//! - [`ClockEngine`]: Clock state machine
//! - [`Database`]: SQLite implementation of every repository
//! - [`Config`]: Application configuration management

pub mod clock;
pub mod error;
pub mod events;
pub mod model;
pub mod scoring;
pub mod session;
pub mod storage;

pub use clock::{ClockEngine, ClockState};
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::Event;
pub use model::{
    Action, ActionStep, ClockMarker, Comment, LogEntry, LogEvent, LogKind, MultiStepAction,
    NewAction, NewComment, NewLogEntry, NewMultiStepAction, NewSpace, NewTodo, NewWasteEntry,
    Space, SpacePatch, Todo, WasteEntry,
};
pub use scoring::Scoreboard;
pub use session::{Outcome, Recorded, Rejection, SessionController, SessionView, StepRecorded};
pub use storage::{Config, Database};
