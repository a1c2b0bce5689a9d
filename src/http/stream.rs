//! The two endpoints that drive an agent turn: opening the SSE event stream
//! for a fresh session, and submitting the collaborator's next input.
//! Also the spec-artifact download endpoint, since it reads back what
//! `submit_user_input` persists to disk.

use std::convert::Infallible;
use std::path::PathBuf;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json, Response};
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::{ErrorContext, GhostPathError};
use crate::llm::{LlmMessage, LlmRole};
use crate::session::AwaitingInputType;

use super::sessions::load_session;
use super::AppState;

const INITIAL_TURN_PROMPT: &str = "Begin working this problem. Run the three analysis gates \
    (decompose_problem, map_conventional_approaches, extract_hidden_axioms), then generate \
    round 1's three premises, obviousness-test each one, and present the round.";

fn spec_path(settings: &crate::config::Settings, session_id: Uuid) -> PathBuf {
    PathBuf::from(&settings.spec_artifact_dir).join(format!("{session_id}.md"))
}

/// `GET /sessions/{id}/stream`
pub async fn stream_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    let session = match load_session(&state, id).await {
        Ok(s) => s,
        Err(e) => return e.into_response(),
    };
    let Some(guard) = state.registry.try_begin_turn(id).await else {
        return GhostPathError::ConcurrencyConflict {
            context: ErrorContext::new().with_session_id(id.to_string()),
        }
        .into_response();
    };

    if session.status == crate::store::models::SessionStatus::Created {
        if let Err(e) = state
            .store
            .set_session_status(id, crate::store::models::SessionStatus::Active, None)
            .await
        {
            return e.into_response();
        }
    }

    let initial = LlmMessage::text(LlmRole::User, INITIAL_TURN_PROMPT);
    let events = state.agent.run_turn(id, guard, Some(initial));
    Sse::new(to_sse(events)).keep_alive(KeepAlive::default()).into_response()
}

fn to_sse(
    events: crate::agent::EventStream,
) -> impl Stream<Item = Result<Event, Infallible>> {
    events.map(|value| {
        let kind = value["type"].as_str().unwrap_or("event").to_string();
        let data = value["data"].to_string();
        Ok(Event::default().event(kind).data(data))
    })
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserInputBody {
    Scores { scores: Vec<f64> },
    AskUserResponse { response: String },
    Resolved { winner: WinnerChoice },
}

#[derive(Debug, Deserialize)]
pub struct WinnerChoice {
    pub title: String,
    #[serde(default)]
    pub score: Option<f64>,
    pub index: usize,
}

fn validation_error(message: impl Into<String>) -> GhostPathError {
    GhostPathError::ValidationError { message: message.into(), context: ErrorContext::new() }
}

/// Translate the submitted payload into the next user message per §4.8: a
/// scored-round listing, the free-text answer to an `ask_user` question, or
/// a resolution request naming the winning premise.
fn build_user_message(body: &UserInputBody) -> Result<(LlmMessage, AwaitingInputType), GhostPathError> {
    match body {
        UserInputBody::Scores { scores } => {
            if scores.len() != 3 {
                return Err(validation_error(format!(
                    "`scores` must have exactly 3 entries, got {}",
                    scores.len()
                )));
            }
            for s in scores {
                if !(0.0..=10.0).contains(s) {
                    return Err(validation_error(format!("each score must be in [0, 10], got {s}")));
                }
            }
            let winner_index = scores
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
                .map(|(i, _)| i)
                .unwrap();
            let listing: String = scores
                .iter()
                .enumerate()
                .map(|(i, s)| {
                    let marker = if i == winner_index { " (winner)" } else { "" };
                    format!("Premise {}: score {s}{marker}", i + 1)
                })
                .collect::<Vec<_>>()
                .join("\n");
            let text = format!(
                "The collaborator scored this round's premises:\n{listing}\n\n\
                 Call store_premise for each of the three premises to persist these scores \
                 and the winner flag, then continue."
            );
            Ok((LlmMessage::text(LlmRole::User, text), AwaitingInputType::None))
        }
        UserInputBody::AskUserResponse { response } => {
            if response.trim().is_empty() {
                return Err(validation_error("`response` must not be empty"));
            }
            let text = format!("The collaborator answered: {response}");
            Ok((LlmMessage::text(LlmRole::User, text), AwaitingInputType::None))
        }
        UserInputBody::Resolved { winner } => {
            if winner.index > 2 {
                return Err(validation_error(format!("`winner.index` must be 0-2, got {}", winner.index)));
            }
            if winner.title.trim().is_empty() {
                return Err(validation_error("`winner.title` must not be empty"));
            }
            let score_clause = winner
                .score
                .map(|s| format!(" (score {s})"))
                .unwrap_or_default();
            let text = format!(
                "The collaborator has requested resolution, choosing premise {} \"{}\"{score_clause} \
                 as the winner. Call generate_final_spec now to produce the final Markdown specification.",
                winner.index + 1,
                winner.title
            );
            Ok((LlmMessage::text(LlmRole::User, text), AwaitingInputType::Resolved))
        }
    }
}

/// `POST /sessions/{id}/user-input`
///
/// Non-streaming: drives one turn to its next pause/halt point and returns
/// the collected events as a JSON array. Persists `spec_content` to
/// `spec_artifact_dir` when a `final_spec` event is observed (§4.8).
pub async fn submit_user_input(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UserInputBody>,
) -> Result<impl IntoResponse, GhostPathError> {
    load_session(&state, id).await?;

    let (message, awaiting_type) = build_user_message(&body)?;

    let Some(mut guard) = state.registry.try_begin_turn(id).await else {
        return Err(GhostPathError::ConcurrencyConflict {
            context: ErrorContext::new().with_session_id(id.to_string()),
        });
    };
    guard.awaiting_input_type = awaiting_type;
    guard.awaiting_user_input = false;

    let mut events = state.agent.run_turn(id, guard, Some(message));
    let mut collected = Vec::new();
    let mut spec_content: Option<String> = None;
    while let Some(event) = events.next().await {
        if event["type"] == "final_spec" {
            spec_content = event["data"].as_str().map(str::to_string);
        }
        collected.push(event);
    }

    if let Some(content) = spec_content {
        let path = spec_path(&state.settings, id);
        if let Some(parent) = path.parent() {
            let _ = tokio::fs::create_dir_all(parent).await;
        }
        if let Err(e) = tokio::fs::write(&path, content).await {
            tracing::warn!(session_id = %id, error = %e, "failed to persist spec artifact to disk");
        }
    }

    Ok(Json(json!({ "events": collected })))
}

/// `GET /sessions/{id}/spec`
pub async fn get_spec(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<impl IntoResponse, GhostPathError> {
    let session = load_session(&state, id).await?;
    let content = session.spec_content.ok_or_else(|| GhostPathError::ResourceNotFound {
        message: format!("session {id} has no generated spec yet"),
        context: ErrorContext::new().with_session_id(id.to_string()),
    })?;
    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/markdown; charset=utf-8")
        .body(axum::body::Body::from(content))
        .expect("static header name/value are always valid");
    Ok(response)
}
