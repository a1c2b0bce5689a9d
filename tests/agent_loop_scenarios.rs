//! Drives [`ghostpath::AgentLoop`] end to end against a scripted LLM client,
//! reproducing the specification's round-one happy path, the iteration-cap
//! failsafe, and the resolution-to-final-spec path.

mod support;

use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use futures_util::StreamExt;
use ghostpath::error::GhostPathError;
use ghostpath::llm::client::Usage;
use ghostpath::llm::{ClientWrapper, ContentBlock, LlmRequest, LlmResponse, StopReason, ToolUse};
use ghostpath::session::SessionState;
use ghostpath::AgentLoop;
use serde_json::{json, Value};
use support::{test_settings, InMemoryStore};
use tokio::sync::Mutex as TokioMutex;

struct ScriptedClient {
    responses: StdMutex<Vec<LlmResponse>>,
}

impl ScriptedClient {
    fn new(responses: Vec<LlmResponse>) -> Self {
        Self { responses: StdMutex::new(responses) }
    }
}

#[async_trait]
impl ClientWrapper for ScriptedClient {
    async fn send(&self, _request: LlmRequest) -> Result<LlmResponse, GhostPathError> {
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            panic!("scripted client ran out of canned responses");
        }
        Ok(responses.remove(0))
    }

    fn model_name(&self) -> &str {
        "scripted-model"
    }
}

fn usage() -> Usage {
    Usage { input_tokens: 50, output_tokens: 20, server_tool_uses: 0 }
}

fn tool_call(name: &str, input: Value) -> LlmResponse {
    LlmResponse {
        content: vec![ContentBlock::ToolUse(ToolUse { id: format!("call_{name}"), name: name.into(), input })],
        stop_reason: StopReason::ToolUse,
        usage: usage(),
    }
}

fn end_turn() -> LlmResponse {
    LlmResponse {
        content: vec![ContentBlock::Text { text: "Stopping here.".into() }],
        stop_reason: StopReason::EndTurn,
        usage: usage(),
    }
}

async fn drain(mut stream: ghostpath::agent::EventStream) -> Vec<Value> {
    let mut out = Vec::new();
    while let Some(event) = stream.next().await {
        out.push(event);
    }
    out
}

fn new_state() -> tokio::sync::OwnedMutexGuard<SessionState> {
    let state = Arc::new(TokioMutex::new(SessionState::default()));
    state.try_lock_owned().unwrap()
}

/// S1 — a full round-one sweep: three gates, three premise generations each
/// immediately obviousness-tested, then a presentation that pauses for
/// scores.
#[tokio::test]
async fn round_one_happy_path_pauses_awaiting_scores() {
    let (store, session) = InMemoryStore::with_session(0);
    let store = Arc::new(store);

    let scripted = vec![
        tool_call("decompose_problem", json!({ "problem_statement": "p", "dimensions": ["cost", "fairness"] })),
        tool_call("map_conventional_approaches", json!({ "approaches": ["seniority rotation"] })),
        tool_call("extract_hidden_axioms", json!({ "axioms": ["one person covers one shift"] })),
        tool_call("generate_premise", json!({ "title": "Idea A", "body": "body A" })),
        tool_call("obviousness_test", json!({ "premise_buffer_index": 0, "premise_title": "Idea A", "obviousness_score": 0.1, "justification": "fresh" })),
        tool_call("generate_premise", json!({ "title": "Idea B", "body": "body B" })),
        tool_call("obviousness_test", json!({ "premise_buffer_index": 1, "premise_title": "Idea B", "obviousness_score": 0.1, "justification": "fresh" })),
        tool_call("generate_premise", json!({ "title": "Idea C", "body": "body C" })),
        tool_call("obviousness_test", json!({ "premise_buffer_index": 2, "premise_title": "Idea C", "obviousness_score": 0.1, "justification": "fresh" })),
        tool_call("present_round", json!({})),
    ];
    let llm: Arc<dyn ClientWrapper> = Arc::new(ScriptedClient::new(scripted));
    let settings = Arc::new(test_settings());
    let agent = AgentLoop::new(store.clone(), llm, settings);

    let events = drain(agent.run_turn(session.id, new_state(), None)).await;

    assert!(events.iter().any(|e| e["type"] == "premises"));
    let last = events.last().unwrap();
    assert_eq!(last["type"], "done");
    assert_eq!(last["data"]["error"], false);
    assert_eq!(last["data"]["awaiting_input"], true);
    // No `tool_error` events should appear on the clean happy path.
    assert!(!events.iter().any(|e| e["type"] == "tool_error"));
}

/// S6 — a client that never calls a pausing tool runs the loop out past its
/// cap and the turn ends in an `AGENT_LOOP_EXCEEDED` error, not a hang.
#[tokio::test]
async fn runaway_tool_calls_trip_the_iteration_cap() {
    let (store, session) = InMemoryStore::with_session(0);
    let store = Arc::new(store);

    let scripted: Vec<LlmResponse> = (0..4).map(|_| tool_call("get_context_usage", json!({}))).collect();
    let llm: Arc<dyn ClientWrapper> = Arc::new(ScriptedClient::new(scripted));
    let mut settings = test_settings();
    settings.agent_max_iterations = 4;
    let agent = AgentLoop::new(store.clone(), llm, Arc::new(settings));

    let events = drain(agent.run_turn(session.id, new_state(), None)).await;

    let error_codes: Vec<&str> = events
        .iter()
        .filter(|e| e["type"] == "error")
        .filter_map(|e| e["data"]["code"].as_str())
        .collect();
    assert!(error_codes.contains(&"AGENT_LOOP_EXCEEDED"));
    let last = events.last().unwrap();
    assert_eq!(last["type"], "done");
    assert_eq!(last["data"]["error"], true);
}

/// S8 — once the collaborator has picked a winner, `generate_final_spec`
/// emits `final_spec` and `spec_file_ready` and the turn pauses rather than
/// looping further.
#[tokio::test]
async fn resolution_emits_final_spec_and_pauses() {
    let (store, session) = InMemoryStore::with_session(0);
    let store = Arc::new(store);

    let spec_markdown = "# Final Specification\n\nChosen premise: Idea A.";
    let scripted = vec![tool_call(
        "generate_final_spec",
        json!({
            "winning_premise_title": "Idea A",
            "winning_premise_body": "body A",
            "problem_statement": "How should a small team schedule on-call rotations fairly?",
            "spec_content": spec_markdown,
        }),
    )];
    let llm: Arc<dyn ClientWrapper> = Arc::new(ScriptedClient::new(scripted));
    let settings = Arc::new(test_settings());
    let mut state = SessionState::default();
    state.awaiting_input_type = ghostpath::session::AwaitingInputType::Resolved;
    let state = Arc::new(TokioMutex::new(state));
    let guard = state.try_lock_owned().unwrap();
    let agent = AgentLoop::new(store.clone(), llm, settings);

    let events = drain(agent.run_turn(session.id, guard, None)).await;

    let final_spec = events.iter().find(|e| e["type"] == "final_spec").expect("final_spec event");
    assert_eq!(final_spec["data"], spec_markdown);
    assert!(events.iter().any(|e| e["type"] == "spec_file_ready"));
    let last = events.last().unwrap();
    assert_eq!(last["data"]["awaiting_input"], true);
}

/// A client that simply stops without invoking any tool halts the turn
/// cleanly with `awaiting_input: false`, freeing the session for the next
/// independently-initiated turn.
#[tokio::test]
async fn halting_without_a_tool_call_does_not_leave_the_turn_paused() {
    let (store, session) = InMemoryStore::with_session(0);
    let store = Arc::new(store);
    let llm: Arc<dyn ClientWrapper> = Arc::new(ScriptedClient::new(vec![end_turn()]));
    let settings = Arc::new(test_settings());
    let agent = AgentLoop::new(store.clone(), llm, settings);

    let events = drain(agent.run_turn(session.id, new_state(), None)).await;

    let last = events.last().unwrap();
    assert_eq!(last["type"], "done");
    assert_eq!(last["data"]["error"], false);
    assert_eq!(last["data"]["awaiting_input"], false);
}
