mod engine;

pub use engine::{elapsed_secs, whole_minutes, ClockEngine, ClockState};
