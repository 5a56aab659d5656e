//! In-flight operation guard.
//!
//! One flag per operation kind. A second clock operation started while the
//! first is still running is rejected, not queued. The flag is released
//! when the token drops, including on an early `?` return.

use std::cell::Cell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Clock-in and clock-out share one flag.
    Clock,
    /// Action, step and waste recording.
    Record,
}

#[derive(Debug, Default)]
pub struct InFlight {
    clock: Cell<bool>,
    record: Cell<bool>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    fn flag(&self, kind: OperationKind) -> &Cell<bool> {
        match kind {
            OperationKind::Clock => &self.clock,
            OperationKind::Record => &self.record,
        }
    }

    pub fn is_busy(&self, kind: OperationKind) -> bool {
        self.flag(kind).get()
    }

    /// Claim the flag for `kind`, or `None` if it is already held.
    pub fn try_begin(&self, kind: OperationKind) -> Option<InFlightToken<'_>> {
        let flag = self.flag(kind);
        if flag.replace(true) {
            return None;
        }
        Some(InFlightToken { guard: self, kind })
    }
}

/// Holds an operation flag until dropped.
#[derive(Debug)]
#[must_use = "the operation is only guarded while the token is alive"]
pub struct InFlightToken<'a> {
    guard: &'a InFlight,
    kind: OperationKind,
}

impl Drop for InFlightToken<'_> {
    fn drop(&mut self) {
        self.guard.flag(self.kind).set(false);
    }
}
