//! Session orchestration.
//!
//! [`SessionController`] is the only writer of ledger entries. Each of its
//! operations appends to the ledger first and then updates the space, so an
//! interruption between the two leaves an orphan log entry that the next
//! [`SessionController::load`] reconciles, never an aggregate without an
//! audit trail.

mod controller;
mod guard;
mod view;

pub use controller::SessionController;
pub use guard::{InFlight, InFlightToken, OperationKind};
pub use view::{Outcome, Recorded, Rejection, SessionView, StepRecorded};
