//! Session State & Validators: the pure in-memory state machine that
//! enforces analysis→generation ordering and round-buffer invariants.

pub mod state;
pub mod validators;

pub use state::{AwaitingInputType, Gate, SessionRegistry, SessionState};
pub use validators::{
    check_generation_preconditions, check_round_presentation, evaluate_obviousness,
    ObviousnessOutcome,
};
