//! Tool Dispatch (§4.6): an explicit `{tool_name → handler}` table. No
//! reflection, no method-name lookup — unknown names are reported, not
//! raised.

use serde_json::Value;

use crate::error::{ErrorContext, GhostPathError};

use super::{analysis, generation, innovation, interaction, memory, ToolContext, ToolOutcome};

/// Every tool name the agent loop may encounter, in the order §4.5 lists the
/// five categories. The HTTP/LLM-client layer advertises these as available
/// tools; `dispatch` is the single place that must stay in sync with them.
pub const TOOL_NAMES: [&str; 17] = [
    "decompose_problem",
    "map_conventional_approaches",
    "extract_hidden_axioms",
    "generate_premise",
    "mutate_premise",
    "cross_pollinate",
    "challenge_axiom",
    "import_foreign_domain",
    "obviousness_test",
    "invert_problem",
    "ask_user",
    "present_round",
    "generate_final_spec",
    "store_premise",
    "query_premises",
    "get_negative_context",
    "get_context_usage",
];

/// Run the named tool against `input`. Unrecognized names produce a tagged
/// `UNKNOWN_TOOL` result rather than panicking — the agent loop treats this
/// the same as any other handler failure.
pub async fn dispatch(
    ctx: &mut ToolContext<'_>,
    tool_name: &str,
    input: Value,
) -> Result<ToolOutcome, GhostPathError> {
    match tool_name {
        "decompose_problem" => analysis::decompose_problem(ctx, input).await,
        "map_conventional_approaches" => analysis::map_conventional_approaches(ctx, input).await,
        "extract_hidden_axioms" => analysis::extract_hidden_axioms(ctx, input).await,
        "generate_premise" => generation::generate_premise(ctx, input).await,
        "mutate_premise" => generation::mutate_premise(ctx, input).await,
        "cross_pollinate" => generation::cross_pollinate(ctx, input).await,
        "challenge_axiom" => innovation::challenge_axiom(ctx, input).await,
        "import_foreign_domain" => innovation::import_foreign_domain(ctx, input).await,
        "obviousness_test" => innovation::obviousness_test(ctx, input).await,
        "invert_problem" => innovation::invert_problem(ctx, input).await,
        "ask_user" => interaction::ask_user(ctx, input).await,
        "present_round" => interaction::present_round(ctx, input).await,
        "generate_final_spec" => interaction::generate_final_spec(ctx, input).await,
        "store_premise" => memory::store_premise(ctx, input).await,
        "query_premises" => memory::query_premises(ctx, input).await,
        "get_negative_context" => memory::get_negative_context(ctx, input).await,
        "get_context_usage" => memory::get_context_usage(ctx, input).await,
        other => Err(GhostPathError::UnknownTool {
            tool_name: other.to_string(),
            context: ErrorContext::new(),
        }),
    }
}
