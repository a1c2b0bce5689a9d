//! Analysis (gate) tools: `decompose_problem`, `map_conventional_approaches`,
//! `extract_hidden_axioms`. Each marks one of the three mandatory gates that
//! unlock generation tools and persists its payload on the durable session
//! record (`Store::record_analysis`).

use serde_json::{json, Value};

use crate::error::GhostPathError;
use crate::session::Gate;

use super::{optional_str_array, require_str, require_str_array, ToolContext, ToolOutcome};

fn gates_envelope(state: &crate::session::SessionState, message: &str) -> Value {
    json!({
        "status": "ok",
        "gates_completed": Gate::ALL
            .iter()
            .filter(|g| state.completed_gates.contains(*g))
            .map(Gate::name)
            .collect::<Vec<_>>(),
        "gates_remaining": state.missing_gates(),
        "message": message,
    })
}

pub async fn decompose_problem(
    ctx: &mut ToolContext<'_>,
    input: Value,
) -> Result<ToolOutcome, GhostPathError> {
    let problem_statement = require_str(&input, "problem_statement")?;
    let dimensions = require_str_array(&input, "dimensions")?;
    let constraints_real = optional_str_array(&input, "constraints_real");
    let constraints_assumed = optional_str_array(&input, "constraints_assumed");
    let success_metrics = optional_str_array(&input, "success_metrics");

    ctx.store
        .record_analysis(
            ctx.session_id,
            "decompose_problem",
            &json!({
                "problem_statement": problem_statement,
                "dimensions": dimensions,
                "constraints_real": constraints_real,
                "constraints_assumed": constraints_assumed,
                "success_metrics": success_metrics,
            }),
        )
        .await?;

    ctx.state.completed_gates.insert(Gate::DecomposeProblem);
    Ok(gates_envelope(
        ctx.state,
        "problem decomposed across the stated dimensions",
    ))
}

pub async fn map_conventional_approaches(
    ctx: &mut ToolContext<'_>,
    input: Value,
) -> Result<ToolOutcome, GhostPathError> {
    let approaches = require_str_array(&input, "approaches")?;

    ctx.store
        .record_analysis(
            ctx.session_id,
            "map_conventional_approaches",
            &json!({ "approaches": approaches }),
        )
        .await?;

    ctx.state
        .completed_gates
        .insert(Gate::MapConventionalApproaches);
    Ok(gates_envelope(
        ctx.state,
        "conventional approaches mapped",
    ))
}

pub async fn extract_hidden_axioms(
    ctx: &mut ToolContext<'_>,
    input: Value,
) -> Result<ToolOutcome, GhostPathError> {
    let axioms = require_str_array(&input, "axioms")?;
    let existing_axioms = optional_str_array(&input, "existing_axioms");

    ctx.store
        .record_analysis(
            ctx.session_id,
            "extract_hidden_axioms",
            &json!({ "axioms": axioms, "existing_axioms": existing_axioms }),
        )
        .await?;

    ctx.state.extracted_axioms.extend(axioms.iter().cloned());
    ctx.state.completed_gates.insert(Gate::ExtractHiddenAxioms);
    Ok(gates_envelope(ctx.state, "hidden axioms extracted"))
}
