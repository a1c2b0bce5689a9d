//! Pure functions that inspect [`SessionState`] and return either "ok" or a
//! structured [`GhostPathError`] for a precondition. None of these touch the
//! store or mutate state; they are the gate/round validators from §4.4.

use crate::error::{ErrorContext, GhostPathError};
use crate::store::models::PremiseType;

use super::state::SessionState;

/// `GATES_NOT_SATISFIED` unless all three mandatory analysis gates have run.
pub fn check_gates(state: &SessionState) -> Option<GhostPathError> {
    if state.all_gates_satisfied() {
        return None;
    }
    Some(GhostPathError::GatesNotSatisfied {
        missing_gates: state.missing_gates().iter().map(|s| s.to_string()).collect(),
        context: ErrorContext::new(),
    })
}

/// `AXIOM_NOT_CHALLENGED` iff the requested premise is `radical` and no
/// axiom has been challenged yet this round.
pub fn check_radical(state: &SessionState, premise_type: PremiseType) -> Option<GhostPathError> {
    if premise_type.requires_axiom_challenge() && !state.axiom_challenged {
        return Some(GhostPathError::AxiomNotChallenged {
            context: ErrorContext::new(),
        });
    }
    None
}

/// `NEGATIVE_CONTEXT_MISSING` from round 2 onward, until
/// `get_negative_context` has run for the current round.
pub fn check_negative_context(state: &SessionState) -> Option<GhostPathError> {
    if state.current_round_number >= 1 && !state.negative_context_fetched {
        return Some(GhostPathError::NegativeContextMissing {
            context: ErrorContext::new(),
        });
    }
    None
}

/// `ROUND_BUFFER_FULL` once the buffer already holds the max of three.
pub fn check_buffer_capacity(state: &SessionState) -> Option<GhostPathError> {
    if !state.buffer_has_capacity() {
        return Some(GhostPathError::RoundBufferFull {
            context: ErrorContext::new(),
        });
    }
    None
}

/// Compose the four generation preconditions left-to-right; the first
/// failure short-circuits the rest, per §4.4.
pub fn check_generation_preconditions(
    state: &SessionState,
    premise_type: PremiseType,
) -> Option<GhostPathError> {
    check_gates(state)
        .or_else(|| check_radical(state, premise_type))
        .or_else(|| check_negative_context(state))
        .or_else(|| check_buffer_capacity(state))
}

/// `INCOMPLETE_ROUND` / `UNTESTED_PREMISES` preconditions for `present_round`.
pub fn check_round_presentation(state: &SessionState) -> Option<GhostPathError> {
    if !state.round_is_complete() {
        return Some(GhostPathError::IncompleteRound {
            context: ErrorContext::new(),
        });
    }
    if !state.all_premises_tested() {
        return Some(GhostPathError::UntestedPremises {
            context: ErrorContext::new(),
        });
    }
    None
}

/// Pure result of running the obviousness test against a buffer index and
/// score, before any buffer mutation is applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObviousnessOutcome {
    Ok { premise_index: usize, score: f64 },
    Rejected { premise_index: usize, score: f64 },
}

/// Obviousness threshold from the data model: scores strictly above this are
/// too obvious and reject the premise.
pub const OBVIOUSNESS_THRESHOLD: f64 = 0.6;

/// Evaluate `(buffer_index, score)` against the current state, per §4.4. Does
/// not mutate anything; the caller (the `obviousness_test` handler) applies
/// the buffer compaction on `Rejected`.
pub fn evaluate_obviousness(
    buffer_index: usize,
    score: f64,
    state: &SessionState,
) -> Result<ObviousnessOutcome, GhostPathError> {
    if buffer_index >= state.current_round_buffer.len() {
        return Err(GhostPathError::InvalidIndex {
            context: ErrorContext::new(),
        });
    }
    if score > OBVIOUSNESS_THRESHOLD {
        return Ok(ObviousnessOutcome::Rejected {
            premise_index: buffer_index,
            score,
        });
    }
    Ok(ObviousnessOutcome::Ok {
        premise_index: buffer_index,
        score,
    })
}
