//! Memory tools: `store_premise`, `query_premises`, `get_negative_context`,
//! `get_context_usage`.

use serde_json::{json, Value};

use crate::error::{ErrorContext, GhostPathError};
use crate::store::models::PremiseType;
use crate::store::PremiseQueryFilter;

use super::{optional_f64, optional_str, require_str, ToolContext, ToolOutcome};

fn premise_json(p: &crate::store::models::Premise) -> Value {
    json!({
        "title": p.title,
        "body": p.body,
        "premise_type": p.premise_type,
        "round_number": p.round_number,
        "violated_axiom": p.violated_axiom,
        "cross_domain_source": p.cross_domain_source,
        "score": p.score,
        "user_comment": p.user_comment,
        "is_winner": p.is_winner,
    })
}

/// Overlay the collaborator's evaluation onto the most recently persisted
/// premise matching `title`. Premises exist only once `present_round` has
/// committed them, so an unmatched title is reported rather than raised.
pub async fn store_premise(
    ctx: &mut ToolContext<'_>,
    input: Value,
) -> Result<ToolOutcome, GhostPathError> {
    let title = require_str(&input, "title")?;
    require_str(&input, "premise_type")?;
    let score = optional_f64(&input, "score");
    if let Some(score) = score {
        if !(0.0..=10.0).contains(&score) {
            return Err(GhostPathError::ValidationError {
                message: "score must be in [0.0, 10.0]".to_string(),
                context: ErrorContext::new(),
            });
        }
    }
    let user_comment = optional_str(&input, "user_comment");
    let is_winner = input
        .get("is_winner")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let Some(premise) = ctx.store.find_premise_by_title(ctx.session_id, &title).await? else {
        return Ok(json!({
            "status": "error",
            "error_code": "RESOURCE_NOT_FOUND",
            "message": format!("no persisted premise titled `{title}` in this session"),
        }));
    };

    ctx.store
        .overlay_premise_evaluation(premise.id, score, user_comment.as_deref(), is_winner)
        .await?;

    Ok(json!({ "status": "stored", "title": title, "score": score, "is_winner": is_winner }))
}

fn parse_filter(filter: &str, premise_type: Option<PremiseType>, round_number: Option<i64>) -> Result<PremiseQueryFilter, GhostPathError> {
    match filter {
        "all" => Ok(PremiseQueryFilter::All),
        "winners" => Ok(PremiseQueryFilter::Winners),
        "top_scored" => Ok(PremiseQueryFilter::TopScored),
        "low_scored" => Ok(PremiseQueryFilter::LowScored),
        "by_type" => premise_type.map(PremiseQueryFilter::ByType).ok_or_else(|| {
            GhostPathError::ValidationError {
                message: "`premise_type` is required when filter is `by_type`".to_string(),
                context: ErrorContext::new(),
            }
        }),
        "by_round" => round_number.map(PremiseQueryFilter::ByRound).ok_or_else(|| {
            GhostPathError::ValidationError {
                message: "`round_number` is required when filter is `by_round`".to_string(),
                context: ErrorContext::new(),
            }
        }),
        other => Err(GhostPathError::ValidationError {
            message: format!("unknown filter `{other}`"),
            context: ErrorContext::new(),
        }),
    }
}

/// Read-only projection over this session's persisted premises.
pub async fn query_premises(
    ctx: &mut ToolContext<'_>,
    input: Value,
) -> Result<ToolOutcome, GhostPathError> {
    let filter_name = require_str(&input, "filter")?;
    let premise_type = optional_str(&input, "premise_type").map(|s| PremiseType::from_str(&s));
    let round_number = input.get("round_number").and_then(Value::as_i64);
    let limit = input.get("limit").and_then(Value::as_i64).unwrap_or(10);

    let filter = parse_filter(&filter_name, premise_type, round_number)?;
    let premises = ctx.store.query_premises(ctx.session_id, filter, limit).await?;

    Ok(json!({
        "status": "ok",
        "count": premises.len(),
        "premises": premises.iter().map(premise_json).collect::<Vec<_>>(),
    }))
}

/// Surface previously low-scored premises to steer the next round, and mark
/// negative context as fetched — the side effect is required even if the
/// session has no low-scored premises yet (round 1 callers still unlock
/// round-2 generation this way).
pub async fn get_negative_context(
    ctx: &mut ToolContext<'_>,
    _input: Value,
) -> Result<ToolOutcome, GhostPathError> {
    let premises = ctx.store.negative_context(ctx.session_id).await?;
    ctx.state.negative_context_fetched = true;

    Ok(json!({
        "status": "ok",
        "count": premises.len(),
        "premises": premises.iter().map(premise_json).collect::<Vec<_>>(),
    }))
}

const TOKENS_LIMIT: i64 = 1_000_000;

/// Report how much of the session's token budget has been spent, and a rough
/// estimate of how many more rounds it can sustain.
pub async fn get_context_usage(
    ctx: &mut ToolContext<'_>,
    _input: Value,
) -> Result<ToolOutcome, GhostPathError> {
    let session = ctx
        .store
        .get_session(ctx.session_id)
        .await?
        .ok_or_else(|| GhostPathError::ResourceNotFound {
            message: format!("session {} not found", ctx.session_id),
            context: ErrorContext::new(),
        })?;
    let rounds = ctx.store.count_rounds(ctx.session_id).await?;

    let used = session.token_count;
    let remaining = (TOKENS_LIMIT - used).max(0);
    let usage_percentage = used as f64 / TOKENS_LIMIT as f64 * 100.0;
    let avg_tokens_per_round = used as f64 / rounds.max(1) as f64;
    let estimated_rounds_left = if avg_tokens_per_round > 0.0 {
        (remaining as f64 / avg_tokens_per_round).floor() as i64
    } else {
        // No tokens spent yet: the budget can't be exhausted by extrapolation.
        i64::MAX
    };

    Ok(json!({
        "status": "ok",
        "tokens_used": used,
        "tokens_limit": TOKENS_LIMIT,
        "tokens_remaining": remaining,
        "usage_percentage": usage_percentage,
        "estimated_rounds_left": estimated_rounds_left,
    }))
}
