//! In-memory session state: the ephemeral tracking that lives only for the
//! lifetime of the process, keyed by session id.
//!
//! This is distinct from the durable [`crate::store::models::Session`] row.
//! `SessionState` never touches the database; it tracks what the agent loop
//! has done *this* run so the validators in [`super::validators`] can decide
//! whether a generation or presentation tool is currently allowed.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::store::BufferedPremise;

/// What kind of input the agent loop is currently waiting on, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwaitingInputType {
    None,
    Scores,
    AskUser,
    Resolved,
}

/// The three analysis gates that must all complete before generation tools
/// are reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gate {
    DecomposeProblem,
    MapConventionalApproaches,
    ExtractHiddenAxioms,
}

impl Gate {
    pub const ALL: [Gate; 3] = [
        Gate::DecomposeProblem,
        Gate::MapConventionalApproaches,
        Gate::ExtractHiddenAxioms,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Gate::DecomposeProblem => "decompose_problem",
            Gate::MapConventionalApproaches => "map_conventional_approaches",
            Gate::ExtractHiddenAxioms => "extract_hidden_axioms",
        }
    }
}

/// Ephemeral per-session progress tracked in memory for the lifetime of the
/// process. Everything here is reset to empty when a session's `SessionState`
/// is first created; there is no cross-restart resumption.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub completed_gates: HashSet<Gate>,
    /// At most 3 entries: the premises drafted this round but not yet
    /// presented to the collaborator.
    pub current_round_buffer: Vec<BufferedPremise>,
    pub current_round_number: i64,
    /// Indices into `current_round_buffer` that have passed
    /// `obviousness_test`.
    pub obviousness_tested: HashSet<usize>,
    pub extracted_axioms: Vec<String>,
    pub axiom_challenged: bool,
    pub negative_context_fetched: bool,
    pub awaiting_user_input: bool,
    pub awaiting_input_type: AwaitingInputType,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            completed_gates: HashSet::new(),
            current_round_buffer: Vec::new(),
            current_round_number: 0,
            obviousness_tested: HashSet::new(),
            extracted_axioms: Vec::new(),
            axiom_challenged: false,
            negative_context_fetched: false,
            awaiting_user_input: false,
            awaiting_input_type: AwaitingInputType::None,
        }
    }
}

impl SessionState {
    pub const MAX_BUFFER: usize = 3;

    pub fn all_gates_satisfied(&self) -> bool {
        Gate::ALL.iter().all(|g| self.completed_gates.contains(g))
    }

    pub fn missing_gates(&self) -> Vec<&'static str> {
        Gate::ALL
            .iter()
            .filter(|g| !self.completed_gates.contains(*g))
            .map(|g| g.name())
            .collect()
    }

    pub fn buffer_has_capacity(&self) -> bool {
        self.current_round_buffer.len() < Self::MAX_BUFFER
    }

    pub fn round_is_complete(&self) -> bool {
        self.current_round_buffer.len() == Self::MAX_BUFFER
    }

    pub fn all_premises_tested(&self) -> bool {
        self.round_is_complete()
            && (0..self.current_round_buffer.len()).all(|i| self.obviousness_tested.contains(&i))
    }

    /// Begin a fresh round: bump the round number, clear the buffer and its
    /// obviousness markers, and require negative context to be re-fetched for
    /// round 2 onward (round 1 has none to fetch).
    pub fn start_new_round(&mut self) {
        self.current_round_number += 1;
        self.current_round_buffer.clear();
        self.obviousness_tested.clear();
        self.negative_context_fetched = false;
    }
}

/// Process-wide registry of session state, guarded per-session so only one
/// turn can execute against a given session at a time (see §5).
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<RwLock<HashMap<Uuid, Arc<Mutex<SessionState>>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the per-session lock, creating fresh state if this is the
    /// first time the session has been seen this process lifetime.
    pub async fn lock_for(&self, session_id: Uuid) -> Arc<Mutex<SessionState>> {
        if let Some(existing) = self.inner.read().await.get(&session_id) {
            return existing.clone();
        }
        let mut guard = self.inner.write().await;
        guard
            .entry(session_id)
            .or_insert_with(|| Arc::new(Mutex::new(SessionState::default())))
            .clone()
    }

    /// Attempt to acquire the session's turn lock without waiting. Used by
    /// the HTTP surface to return `CONCURRENCY_CONFLICT` immediately instead
    /// of queuing behind an in-flight turn.
    pub async fn try_begin_turn(
        &self,
        session_id: Uuid,
    ) -> Option<tokio::sync::OwnedMutexGuard<SessionState>> {
        let lock = self.lock_for(session_id).await;
        lock.try_lock_owned().ok()
    }

    pub async fn remove(&self, session_id: Uuid) {
        self.inner.write().await.remove(&session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::PremiseType;

    fn sample_premise(title: &str) -> BufferedPremise {
        BufferedPremise {
            title: title.to_string(),
            body: "body".to_string(),
            premise_type: PremiseType::Initial,
            violated_axiom: None,
            cross_domain_source: None,
        }
    }

    #[test]
    fn all_gates_satisfied_requires_all_three() {
        let mut state = SessionState::default();
        assert!(!state.all_gates_satisfied());
        state.completed_gates.insert(Gate::DecomposeProblem);
        state.completed_gates.insert(Gate::MapConventionalApproaches);
        assert!(!state.all_gates_satisfied());
        state.completed_gates.insert(Gate::ExtractHiddenAxioms);
        assert!(state.all_gates_satisfied());
        assert!(state.missing_gates().is_empty());
    }

    #[test]
    fn buffer_capacity_and_round_completion() {
        let mut state = SessionState::default();
        assert!(state.buffer_has_capacity());
        assert!(!state.round_is_complete());
        for i in 0..3 {
            state.current_round_buffer.push(sample_premise(&format!("p{i}")));
        }
        assert!(!state.buffer_has_capacity());
        assert!(state.round_is_complete());
    }

    #[test]
    fn all_premises_tested_requires_full_round_and_every_index() {
        let mut state = SessionState::default();
        for i in 0..3 {
            state.current_round_buffer.push(sample_premise(&format!("p{i}")));
        }
        assert!(!state.all_premises_tested());
        state.obviousness_tested.insert(0);
        state.obviousness_tested.insert(1);
        assert!(!state.all_premises_tested());
        state.obviousness_tested.insert(2);
        assert!(state.all_premises_tested());
    }

    #[test]
    fn start_new_round_resets_buffer_and_negative_context_flag() {
        let mut state = SessionState::default();
        state.current_round_buffer.push(sample_premise("p0"));
        state.obviousness_tested.insert(0);
        state.negative_context_fetched = true;
        state.start_new_round();
        assert_eq!(state.current_round_number, 1);
        assert!(state.current_round_buffer.is_empty());
        assert!(state.obviousness_tested.is_empty());
        assert!(!state.negative_context_fetched);
    }

    #[tokio::test]
    async fn registry_serializes_turns_per_session() {
        let registry = SessionRegistry::new();
        let id = Uuid::new_v4();
        let first = registry.try_begin_turn(id).await;
        assert!(first.is_some());
        let second = registry.try_begin_turn(id).await;
        assert!(second.is_none(), "second concurrent turn must be rejected");
        drop(first);
        let third = registry.try_begin_turn(id).await;
        assert!(third.is_some());
    }
}
