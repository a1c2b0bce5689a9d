//! Generation tools: `generate_premise`, `mutate_premise`, `cross_pollinate`.
//!
//! All three share one shape: validate the four generation preconditions
//! (§4.4), validate the title, append a [`BufferedPremise`] to the in-memory
//! round buffer, and report the buffer's new occupancy. None of them touch
//! the store — the buffer lives only in [`crate::session::SessionState`]
//! until `present_round` persists it.

use serde_json::{json, Value};

use crate::error::{ErrorContext, GhostPathError};
use crate::session::check_generation_preconditions;
use crate::session::state::SessionState;
use crate::store::models::PremiseType;
use crate::store::BufferedPremise;

use super::{optional_str, require_str, require_str_array, require_title, ToolContext, ToolOutcome};

fn premise_type_from(input: &Value) -> PremiseType {
    optional_str(input, "premise_type")
        .map(|s| PremiseType::from_str(&s))
        .unwrap_or(PremiseType::Initial)
}

fn buffered_envelope(ctx: &ToolContext<'_>) -> Value {
    json!({
        "status": "ok",
        "buffer_position": ctx.state.current_round_buffer.len() - 1,
        "premises_in_buffer": ctx.state.current_round_buffer.len(),
        "premises_remaining": SessionState::MAX_BUFFER - ctx.state.current_round_buffer.len(),
    })
}

fn push_premise(
    ctx: &mut ToolContext<'_>,
    title: String,
    body: String,
    premise_type: PremiseType,
    violated_axiom: Option<String>,
    cross_domain_source: Option<String>,
) -> Result<ToolOutcome, GhostPathError> {
    if let Some(err) = check_generation_preconditions(ctx.state, premise_type) {
        return Err(err);
    }

    ctx.state.current_round_buffer.push(BufferedPremise {
        title,
        body,
        premise_type,
        violated_axiom,
        cross_domain_source,
    });
    Ok(buffered_envelope(ctx))
}

pub async fn generate_premise(
    ctx: &mut ToolContext<'_>,
    input: Value,
) -> Result<ToolOutcome, GhostPathError> {
    let title = require_title(&input, "title")?;
    let body = require_str(&input, "body")?;
    let premise_type = premise_type_from(&input);
    let violated_axiom = optional_str(&input, "violated_axiom");
    let cross_domain_source = optional_str(&input, "cross_domain_source");
    push_premise(ctx, title, body, premise_type, violated_axiom, cross_domain_source)
}

pub async fn mutate_premise(
    ctx: &mut ToolContext<'_>,
    input: Value,
) -> Result<ToolOutcome, GhostPathError> {
    // `source_title`/`source_body`/`mutation_strength` describe provenance
    // for the LLM's own bookkeeping; the resulting premise is staged exactly
    // like a fresh `generate_premise` call.
    require_str(&input, "source_title")?;
    let title = require_title(&input, "title")?;
    let body = require_str(&input, "body")?;
    let premise_type = premise_type_from(&input);
    if let Some(strength) = input.get("mutation_strength").and_then(Value::as_f64) {
        if !(0.1..=1.0).contains(&strength) {
            return Err(GhostPathError::ValidationError {
                message: "mutation_strength must be in [0.1, 1.0]".to_string(),
                context: ErrorContext::new(),
            });
        }
    }
    let violated_axiom = optional_str(&input, "violated_axiom");
    let cross_domain_source = optional_str(&input, "cross_domain_source");
    push_premise(ctx, title, body, premise_type, violated_axiom, cross_domain_source)
}

pub async fn cross_pollinate(
    ctx: &mut ToolContext<'_>,
    input: Value,
) -> Result<ToolOutcome, GhostPathError> {
    require_str(&input, "primary_title")?;
    let secondary_premises = require_str_array(&input, "secondary_premises")?;
    if secondary_premises.is_empty() {
        return Err(GhostPathError::ValidationError {
            message: "secondary_premises must name at least one premise".to_string(),
            context: ErrorContext::new(),
        });
    }
    require_str(&input, "synthesis_strategy")?;
    let title = require_title(&input, "title")?;
    let body = require_str(&input, "body")?;
    // Combination is the default type for a cross-pollination result, but an
    // explicit override is still honored.
    let premise_type = optional_str(&input, "premise_type")
        .map(|s| PremiseType::from_str(&s))
        .unwrap_or(PremiseType::Combination);
    let violated_axiom = optional_str(&input, "violated_axiom");
    let cross_domain_source = optional_str(&input, "cross_domain_source");
    push_premise(ctx, title, body, premise_type, violated_axiom, cross_domain_source)
}
