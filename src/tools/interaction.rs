//! Interaction tools: `ask_user`, `present_round`, `generate_final_spec`.
//!
//! These are the three pause points from §4.5/§4.7: after any of them
//! succeeds, the agent loop appends the turn's tool results and halts,
//! waiting for the human collaborator to respond through the HTTP surface.

use chrono::Utc;
use serde_json::{json, Value};

use crate::error::{ErrorContext, GhostPathError};
use crate::session::{check_round_presentation, AwaitingInputType};
use crate::store::models::SessionStatus;

use super::{optional_str, require_str, ToolContext, ToolOutcome};

const MIN_OPTIONS: usize = 2;
const MAX_OPTIONS: usize = 5;

/// Pause the turn until the collaborator answers a clarifying question.
///
/// Side effects are limited to `awaiting_user_input`/`awaiting_input_type`;
/// the question itself is not persisted anywhere. The agent loop re-emits the
/// original tool input on the stream so the client can render it (§4.5).
pub async fn ask_user(ctx: &mut ToolContext<'_>, input: Value) -> Result<ToolOutcome, GhostPathError> {
    require_str(&input, "question")?;
    let options = input
        .get("options")
        .and_then(Value::as_array)
        .ok_or_else(|| validation_error("`options` is required and must be an array"))?;
    if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&options.len()) {
        return Err(validation_error(format!(
            "`options` must have between {MIN_OPTIONS} and {MAX_OPTIONS} entries, got {}",
            options.len()
        )));
    }
    for option in options {
        if option.get("label").and_then(Value::as_str).is_none() {
            return Err(validation_error("each option requires a `label`"));
        }
    }

    ctx.state.awaiting_user_input = true;
    ctx.state.awaiting_input_type = AwaitingInputType::AskUser;

    Ok(json!({ "status": "awaiting_user_response" }))
}

/// Present the current round: commit its three premises to the store as the
/// source of truth, reset all per-round flags, and pause for user scores.
pub async fn present_round(
    ctx: &mut ToolContext<'_>,
    input: Value,
) -> Result<ToolOutcome, GhostPathError> {
    if let Some(err) = check_round_presentation(ctx.state) {
        return Err(err);
    }
    let round_summary = optional_str(&input, "round_summary");

    let round_number = ctx.state.current_round_number + 1;
    let created = ctx
        .store
        .present_round(ctx.session_id, round_number, &ctx.state.current_round_buffer)
        .await?;

    ctx.state.start_new_round();
    // `start_new_round` clears the buffer/obviousness flags and re-arms
    // negative-context for round 2+; the axiom-challenge flag is scoped to
    // the round the same way (I5) and isn't start_new_round's job to reset.
    ctx.state.axiom_challenged = false;
    ctx.state.awaiting_user_input = true;
    ctx.state.awaiting_input_type = AwaitingInputType::Scores;

    Ok(json!({
        "status": "awaiting_user_scores",
        "round_number": round_number,
        "round_summary": round_summary,
        "premises": created.iter().map(|p| json!({
            "title": p.title,
            "body": p.body,
            "premise_type": p.premise_type,
            "violated_axiom": p.violated_axiom,
            "cross_domain_source": p.cross_domain_source,
        })).collect::<Vec<_>>(),
    }))
}

/// Produce the final Markdown spec from the winning premise. Only reachable
/// once the collaborator has explicitly requested resolution (the HTTP
/// surface marks this on `SessionState` before starting the turn).
pub async fn generate_final_spec(
    ctx: &mut ToolContext<'_>,
    input: Value,
) -> Result<ToolOutcome, GhostPathError> {
    if ctx.state.awaiting_input_type != AwaitingInputType::Resolved {
        return Err(validation_error(
            "generate_final_spec is only callable after the user has requested resolution",
        ));
    }
    require_str(&input, "winning_premise_title")?;
    require_str(&input, "winning_premise_body")?;
    require_str(&input, "problem_statement")?;
    let spec_content = require_str(&input, "spec_content")?;

    let resolved_at = Utc::now();
    ctx.store
        .resolve_session(ctx.session_id, resolved_at, &spec_content)
        .await?;
    ctx.store
        .set_session_status(ctx.session_id, SessionStatus::Resolved, Some(resolved_at))
        .await?;

    ctx.state.awaiting_user_input = false;
    ctx.state.awaiting_input_type = AwaitingInputType::None;

    Ok(json!({ "status": "ok" }))
}

fn validation_error(message: impl Into<String>) -> GhostPathError {
    GhostPathError::ValidationError {
        message: message.into(),
        context: ErrorContext::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionState;
    use crate::store::BufferedPremise;
    use crate::store::models::PremiseType;
    use crate::tools::test_support::{test_settings, InMemoryStore};

    fn buffer_of_three() -> Vec<BufferedPremise> {
        (0..3)
            .map(|i| BufferedPremise {
                title: format!("p{i}"),
                body: "b".into(),
                premise_type: PremiseType::Initial,
                violated_axiom: None,
                cross_domain_source: None,
            })
            .collect()
    }

    #[tokio::test]
    async fn ask_user_rejects_too_few_options() {
        let mut state = SessionState::default();
        let settings = test_settings();
        let store = InMemoryStore::default();
        let mut ctx = ToolContext {
            session_id: uuid::Uuid::new_v4(),
            state: &mut state,
            store: &store,
            settings: &settings,
        };
        let err = ask_user(
            &mut ctx,
            json!({ "question": "Pick one", "options": [{"label": "A"}] }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, GhostPathError::ValidationError { .. }));
    }

    #[tokio::test]
    async fn ask_user_pauses_the_turn() {
        let mut state = SessionState::default();
        let settings = test_settings();
        let store = InMemoryStore::default();
        let mut ctx = ToolContext {
            session_id: uuid::Uuid::new_v4(),
            state: &mut state,
            store: &store,
            settings: &settings,
        };
        let result = ask_user(
            &mut ctx,
            json!({
                "question": "Which approach?",
                "options": [{"label": "A"}, {"label": "B"}],
            }),
        )
        .await
        .unwrap();
        assert_eq!(result["status"], "awaiting_user_response");
        assert!(ctx.state.awaiting_user_input);
        assert_eq!(ctx.state.awaiting_input_type, AwaitingInputType::AskUser);
    }

    #[tokio::test]
    async fn present_round_commits_buffer_and_resets_flags() {
        let mut state = SessionState::default();
        state.current_round_buffer = buffer_of_three();
        state.obviousness_tested.extend([0, 1, 2]);
        state.axiom_challenged = true;
        let settings = test_settings();
        let store = InMemoryStore::default();
        let session_id = uuid::Uuid::new_v4();
        let mut ctx = ToolContext {
            session_id,
            state: &mut state,
            store: &store,
            settings: &settings,
        };
        let result = present_round(&mut ctx, json!({})).await.unwrap();
        assert_eq!(result["status"], "awaiting_user_scores");
        assert_eq!(result["round_number"], 1);
        assert_eq!(result["premises"].as_array().unwrap().len(), 3);
        assert_eq!(ctx.state.current_round_number, 1);
        assert!(ctx.state.current_round_buffer.is_empty());
        assert!(ctx.state.obviousness_tested.is_empty());
        assert!(!ctx.state.axiom_challenged);
        assert!(!ctx.state.negative_context_fetched);
        assert!(ctx.state.awaiting_user_input);
        assert_eq!(ctx.state.awaiting_input_type, AwaitingInputType::Scores);
        assert_eq!(store.premises.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn present_round_rejects_incomplete_buffer() {
        let mut state = SessionState::default();
        let settings = test_settings();
        let store = InMemoryStore::default();
        let mut ctx = ToolContext {
            session_id: uuid::Uuid::new_v4(),
            state: &mut state,
            store: &store,
            settings: &settings,
        };
        let err = present_round(&mut ctx, json!({})).await.unwrap_err();
        assert!(matches!(err, GhostPathError::IncompleteRound { .. }));
    }

    #[tokio::test]
    async fn generate_final_spec_requires_prior_resolution_request() {
        let mut state = SessionState::default();
        let settings = test_settings();
        let store = InMemoryStore::default();
        let mut ctx = ToolContext {
            session_id: uuid::Uuid::new_v4(),
            state: &mut state,
            store: &store,
            settings: &settings,
        };
        let err = generate_final_spec(
            &mut ctx,
            json!({
                "winning_premise_title": "p0",
                "winning_premise_body": "b",
                "problem_statement": "problem",
                "spec_content": "# spec",
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, GhostPathError::ValidationError { .. }));
    }

    #[tokio::test]
    async fn generate_final_spec_resolves_session_once_requested() {
        let mut state = SessionState::default();
        state.awaiting_input_type = AwaitingInputType::Resolved;
        let settings = test_settings();
        let store = InMemoryStore::with_session(1_000);
        let session_id = uuid::Uuid::new_v4();
        let mut ctx = ToolContext {
            session_id,
            state: &mut state,
            store: &store,
            settings: &settings,
        };
        let result = generate_final_spec(
            &mut ctx,
            json!({
                "winning_premise_title": "p0",
                "winning_premise_body": "b",
                "problem_statement": "problem",
                "spec_content": "# spec",
            }),
        )
        .await
        .unwrap();
        assert_eq!(result["status"], "ok");
        assert_eq!(ctx.state.awaiting_input_type, AwaitingInputType::None);
        let session = store.session.lock().unwrap().clone().unwrap();
        assert_eq!(session.status, crate::store::models::SessionStatus::Resolved);
        assert!(session.resolved_at.is_some());
        assert_eq!(session.spec_content.as_deref(), Some("# spec"));
    }
}
