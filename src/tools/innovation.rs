//! Innovation tools: `challenge_axiom`, `import_foreign_domain`,
//! `obviousness_test`, `invert_problem`.

use serde_json::{json, Value};

use crate::error::GhostPathError;
use crate::session::{evaluate_obviousness, ObviousnessOutcome};

use super::{require_f64, require_str, require_usize, ToolContext, ToolOutcome};

const VIOLATION_STRATEGIES: [&str; 5] = ["negate", "invert", "remove", "replace", "exaggerate"];

/// Unlocks `radical` premises for the rest of the round. Per the source's
/// documented behavior (§9 open question), an axiom absent from
/// `extracted_axioms` produces a warning rather than a hard failure — and if
/// no axioms have been extracted yet at all, even that warning is skipped.
pub async fn challenge_axiom(
    ctx: &mut ToolContext<'_>,
    input: Value,
) -> Result<ToolOutcome, GhostPathError> {
    let axiom = require_str(&input, "axiom")?;
    let violation_strategy = require_str(&input, "violation_strategy")?;
    if !VIOLATION_STRATEGIES.contains(&violation_strategy.as_str()) {
        return Err(GhostPathError::ValidationError {
            message: format!(
                "violation_strategy must be one of {VIOLATION_STRATEGIES:?}, got `{violation_strategy}`"
            ),
            context: crate::error::ErrorContext::new(),
        });
    }
    let resulting_insight = require_str(&input, "resulting_insight")?;

    ctx.state.axiom_challenged = true;

    let known = ctx.state.extracted_axioms.iter().any(|a| a == &axiom);
    if !known && !ctx.state.extracted_axioms.is_empty() {
        return Ok(json!({
            "status": "warning",
            "message": format!("`{axiom}` was not among the extracted axioms for this session"),
            "axiom_challenged": true,
            "resulting_insight": resulting_insight,
        }));
    }

    Ok(json!({
        "status": "ok",
        "axiom_challenged": true,
        "resulting_insight": resulting_insight,
    }))
}

/// Side-effect-free: the LLM's cross-domain translation is simply echoed
/// back as an acknowledgement so it lands in the message history.
pub async fn import_foreign_domain(
    _ctx: &mut ToolContext<'_>,
    input: Value,
) -> Result<ToolOutcome, GhostPathError> {
    let problem_domain = require_str(&input, "problem_domain")?;
    let source_domain = require_str(&input, "source_domain")?;
    let analogy_seed = require_str(&input, "analogy_seed")?;
    let translated_insight = require_str(&input, "translated_insight")?;
    Ok(json!({
        "status": "ok",
        "problem_domain": problem_domain,
        "source_domain": source_domain,
        "analogy_seed": analogy_seed,
        "translated_insight": translated_insight,
    }))
}

/// Evaluate and, on rejection, compact the buffer. Idempotent on repeat `ok`
/// calls against the same index per §9's open question: re-testing an
/// already-tested index just leaves `obviousness_tested` unchanged.
pub async fn obviousness_test(
    ctx: &mut ToolContext<'_>,
    input: Value,
) -> Result<ToolOutcome, GhostPathError> {
    let buffer_index = require_usize(&input, "premise_buffer_index")?;
    let premise_title = require_str(&input, "premise_title")?;
    let obviousness_score = require_f64(&input, "obviousness_score")?;
    if !(0.0..=1.0).contains(&obviousness_score) {
        return Err(GhostPathError::ValidationError {
            message: "obviousness_score must be in [0, 1]".to_string(),
            context: crate::error::ErrorContext::new(),
        });
    }
    let justification = require_str(&input, "justification")?;

    match evaluate_obviousness(buffer_index, obviousness_score, ctx.state)? {
        ObviousnessOutcome::Rejected { premise_index, score } => {
            ctx.state.current_round_buffer.remove(premise_index);
            // Renumber: every tested index above the removed one shifts down
            // by one; the removed index itself (if present) is dropped.
            ctx.state.obviousness_tested = ctx
                .state
                .obviousness_tested
                .iter()
                .filter(|&&i| i != premise_index)
                .map(|&i| if i > premise_index { i - 1 } else { i })
                .collect();
            Ok(json!({
                "status": "rejected",
                "error_code": "TOO_OBVIOUS",
                "premise_index": premise_index,
                "premise_title": premise_title,
                "score": score,
                "premises_in_buffer": ctx.state.current_round_buffer.len(),
            }))
        }
        ObviousnessOutcome::Ok { premise_index, score } => {
            ctx.state.obviousness_tested.insert(premise_index);
            Ok(json!({
                "status": "ok",
                "premise_index": premise_index,
                "premise_title": premise_title,
                "score": score,
                "justification": justification,
                "premises_tested": ctx.state.obviousness_tested.len(),
                "premises_in_buffer": ctx.state.current_round_buffer.len(),
            }))
        }
    }
}

/// Side-effect-free: reframes the problem and echoes the LLM's own insights.
pub async fn invert_problem(
    _ctx: &mut ToolContext<'_>,
    input: Value,
) -> Result<ToolOutcome, GhostPathError> {
    let original_problem = require_str(&input, "original_problem")?;
    let inversion_type = require_str(&input, "inversion_type")?;
    let inverted_framing = require_str(&input, "inverted_framing")?;
    let insights = input
        .get("insights")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    Ok(json!({
        "status": "ok",
        "original_problem": original_problem,
        "inversion_type": inversion_type,
        "inverted_framing": inverted_framing,
        "insights": insights,
    }))
}
