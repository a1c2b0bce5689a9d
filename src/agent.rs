//! Agent Loop (§4.7): the finite-turn async generator driving one session
//! turn from the first LLM call through to a pause or halt point.
//!
//! Modeled as an `async_stream::stream!` generator yielding stream-envelope
//! JSON values, the same shape the NeoMind-lineage agent loops in the
//! retrieved corpus build their event streams with — a `Pin<Box<dyn Stream>>`
//! the transport layer forwards directly as SSE frames.

use std::pin::Pin;
use std::sync::Arc;

use async_stream::stream;
use futures_util::Stream;
use serde_json::{json, Value};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Settings;
use crate::error::GhostPathError;
use crate::llm::{ClientWrapper, ContentBlock, LlmMessage, LlmRequest, LlmRole, StopReason};
use crate::session::SessionState;
use crate::store::StorePort;
use crate::tools::{dispatch, tool_definitions, ToolContext};

pub type EventStream = Pin<Box<dyn Stream<Item = Value> + Send>>;

const MAX_TOKENS_PER_CALL: u32 = 4096;
const TOKENS_LIMIT: i64 = 1_000_000;
const INPUT_PREVIEW_LEN: usize = 200;

fn event(kind: &str, data: Value) -> Value {
    json!({ "type": kind, "data": data })
}

fn done(error: bool, awaiting_input: bool) -> Value {
    event("done", json!({ "error": error, "awaiting_input": awaiting_input }))
}

fn preview(input: &Value) -> String {
    let rendered = input.to_string();
    if rendered.len() > INPUT_PREVIEW_LEN {
        format!("{}…", &rendered[..INPUT_PREVIEW_LEN])
    } else {
        rendered
    }
}

fn system_prompt(problem: &str) -> String {
    format!(
        "You are the GhostPath evolutionary idea-generation orchestrator. \
         Drive the problem below through the three analysis gates, then \
         repeated rounds of premise generation, obviousness testing, and \
         presentation, pausing for the human collaborator between rounds.\n\n\
         Problem: {problem}"
    )
}

/// Runs the agent loop against a shared store/LLM client/settings triple.
/// Cheap to clone: everything it owns is an `Arc`.
#[derive(Clone)]
pub struct AgentLoop {
    store: Arc<dyn StorePort>,
    llm: Arc<dyn ClientWrapper>,
    settings: Arc<Settings>,
}

impl AgentLoop {
    pub fn new(store: Arc<dyn StorePort>, llm: Arc<dyn ClientWrapper>, settings: Arc<Settings>) -> Self {
        Self { store, llm, settings }
    }

    /// Drive one turn for `session_id`. `state` must be the turn-exclusive
    /// guard obtained from [`crate::session::SessionRegistry::try_begin_turn`];
    /// the caller holds it until the returned stream is fully drained.
    /// `user_message`, when present, is appended to history before the first
    /// LLM call (built by the HTTP surface per §4.8's input-translation rule).
    pub fn run_turn(
        &self,
        session_id: Uuid,
        mut state: OwnedMutexGuard<SessionState>,
        user_message: Option<LlmMessage>,
    ) -> EventStream {
        let store = self.store.clone();
        let llm = self.llm.clone();
        let settings = self.settings.clone();

        Box::pin(stream! {
            let Some(session) = (match store.get_session(session_id).await {
                Ok(s) => s,
                Err(e) => {
                    yield event("error", e.to_stream_envelope()["data"].clone());
                    yield done(true, false);
                    return;
                }
            }) else {
                let err = GhostPathError::ResourceNotFound {
                    message: format!("session {session_id} not found"),
                    context: crate::error::ErrorContext::new(),
                };
                yield event("error", err.to_stream_envelope()["data"].clone());
                yield done(true, false);
                return;
            };

            let mut messages: Vec<LlmMessage> =
                serde_json::from_value(session.message_history.clone()).unwrap_or_default();
            if let Some(user_message) = user_message {
                messages.push(user_message);
            }

            let system = system_prompt(&session.problem);
            let tools = tool_definitions();
            let mut token_count = session.token_count;
            let mut rounds = store.count_rounds(session_id).await.unwrap_or(0);

            for iteration in 1..=settings.agent_max_iterations {
                debug!(session_id = %session_id, iteration, "agent loop iteration");

                let request = LlmRequest {
                    model: llm.model_name().to_string(),
                    max_tokens: MAX_TOKENS_PER_CALL,
                    system: system.clone(),
                    tools: tools.clone(),
                    messages: messages.clone(),
                    error_context: Some(
                        crate::error::ErrorContext::new().with_session_id(session_id.to_string()),
                    ),
                };

                let response = match llm.send(request).await {
                    Ok(r) => r,
                    Err(e) => {
                        warn!(session_id = %session_id, error = %e, "LLM call failed");
                        yield event("error", e.to_stream_envelope()["data"].clone());
                        yield done(true, false);
                        return;
                    }
                };

                token_count += response.usage.total() as i64;
                let history_json = serde_json::to_value(&messages).unwrap_or(json!([]));
                if let Err(e) = store.update_session_turn(session_id, token_count, &history_json).await {
                    warn!(session_id = %session_id, error = %e, "failed to persist token usage");
                }

                let avg = token_count as f64 / rounds.max(1) as f64;
                let remaining = (TOKENS_LIMIT - token_count).max(0);
                yield event(
                    "context_usage",
                    json!({
                        "tokens_used": token_count,
                        "tokens_limit": TOKENS_LIMIT,
                        "tokens_remaining": remaining,
                        "usage_percentage": token_count as f64 / TOKENS_LIMIT as f64 * 100.0,
                        "estimated_rounds_left": if avg > 0.0 { (remaining as f64 / avg).floor() as i64 } else { i64::MAX },
                    }),
                );

                for block in &response.content {
                    match block {
                        ContentBlock::Text { text } => {
                            yield event("agent_text", json!(text));
                        }
                        ContentBlock::ToolUse(tu) | ContentBlock::ServerToolUse(tu) => {
                            yield event("tool_call", json!({ "tool": tu.name, "input_preview": preview(&tu.input) }));
                        }
                        ContentBlock::ToolResult { content, .. } => {
                            yield event("tool_result", json!(content));
                        }
                    }
                }

                if response.stop_reason == StopReason::PauseTurn {
                    messages.push(LlmMessage { role: LlmRole::Assistant, content: response.content });
                    continue;
                }

                if !response.has_tool_use() {
                    messages.push(LlmMessage { role: LlmRole::Assistant, content: response.content });
                    let history_json = serde_json::to_value(&messages).unwrap_or(json!([]));
                    if let Err(e) = store.update_session_turn(session_id, token_count, &history_json).await {
                        warn!(session_id = %session_id, error = %e, "failed to persist message history");
                    }
                    yield done(false, false);
                    return;
                }

                let tool_uses = response.tool_uses().into_iter().cloned().collect::<Vec<_>>();
                messages.push(LlmMessage { role: LlmRole::Assistant, content: response.content.clone() });

                let mut pause = false;
                let mut result_blocks = Vec::with_capacity(tool_uses.len());
                for tool_use in &tool_uses {
                    let mut ctx = ToolContext {
                        session_id,
                        state: &mut state,
                        store: &*store,
                        settings: &settings,
                    };
                    let outcome = match dispatch(&mut ctx, &tool_use.name, tool_use.input.clone()).await {
                        Ok(value) => value,
                        Err(e) => e.to_tool_result(),
                    };
                    info!(session_id = %session_id, tool = %tool_use.name, status = %outcome["status"], "tool dispatched");

                    if outcome["status"] == "error" {
                        yield event(
                            "tool_error",
                            json!({
                                "tool": tool_use.name,
                                "error_code": outcome.get("error_code").cloned().unwrap_or(json!("TOOL_EXECUTION_ERROR")),
                                "message": outcome.get("message").cloned().unwrap_or(json!("")),
                            }),
                        );
                    }

                    if tool_use.name == "present_round" && outcome["status"] == "awaiting_user_scores" {
                        yield event("premises", outcome["premises"].clone());
                        rounds += 1;
                        pause = true;
                    }
                    if tool_use.name == "ask_user" {
                        yield event("ask_user", tool_use.input.clone());
                        pause = true;
                    }
                    if tool_use.name == "generate_final_spec" && outcome["status"] == "ok" {
                        if let Some(spec_content) = tool_use.input.get("spec_content").and_then(Value::as_str) {
                            yield event("final_spec", json!(spec_content));
                            yield event(
                                "spec_file_ready",
                                json!({ "download_url": format!("/api/v1/sessions/{session_id}/spec") }),
                            );
                        }
                        pause = true;
                    }

                    result_blocks.push(ContentBlock::ToolResult {
                        tool_use_id: tool_use.id.clone(),
                        content: outcome.to_string(),
                        is_error: outcome["status"] == "error",
                    });
                }

                messages.push(LlmMessage { role: LlmRole::User, content: result_blocks });

                if pause {
                    let history_json = serde_json::to_value(&messages).unwrap_or(json!([]));
                    if let Err(e) = store.update_session_turn(session_id, token_count, &history_json).await {
                        warn!(session_id = %session_id, error = %e, "failed to persist message history");
                    }
                    yield done(false, true);
                    return;
                }
            }

            warn!(session_id = %session_id, "agent loop exceeded its iteration cap");
            let err = GhostPathError::AgentLoopExceeded {
                context: crate::error::ErrorContext::new().with_session_id(session_id.to_string()),
            };
            yield event("error", err.to_stream_envelope()["data"].clone());
            yield done(true, false);
        })
    }
}
