//! JSON-schema tool definitions advertised to the LLM. One entry per name in
//! [`super::dispatch::TOOL_NAMES`]; kept in the same file so the two lists
//! are easy to diff against each other.

use serde_json::{json, Value};

use crate::llm::ToolDefinition;

fn def(name: &str, description: &str, schema: Value) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema: schema,
    }
}

fn obj(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// The full advertised tool list, in category order (§4.5).
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        def(
            "decompose_problem",
            "Break the problem into its constituent dimensions, real and assumed constraints, and success metrics.",
            obj(
                json!({
                    "problem_statement": {"type": "string"},
                    "dimensions": {"type": "array", "items": {"type": "string"}},
                    "constraints_real": {"type": "array", "items": {"type": "string"}},
                    "constraints_assumed": {"type": "array", "items": {"type": "string"}},
                    "success_metrics": {"type": "array", "items": {"type": "string"}},
                }),
                &["problem_statement", "dimensions"],
            ),
        ),
        def(
            "map_conventional_approaches",
            "List the conventional, already-known approaches to this problem.",
            obj(json!({"approaches": {"type": "array", "items": {"type": "string"}}}), &["approaches"]),
        ),
        def(
            "extract_hidden_axioms",
            "Name the unstated assumptions the problem statement takes for granted.",
            obj(
                json!({
                    "axioms": {"type": "array", "items": {"type": "string"}},
                    "existing_axioms": {"type": "array", "items": {"type": "string"}},
                }),
                &["axioms"],
            ),
        ),
        def(
            "generate_premise",
            "Stage a new premise in the current round's buffer.",
            obj(
                json!({
                    "title": {"type": "string"},
                    "body": {"type": "string"},
                    "premise_type": {"type": "string", "enum": ["initial", "conservative", "radical", "combination"]},
                    "direction_hint": {"type": "string"},
                    "violated_axiom": {"type": "string"},
                    "cross_domain_source": {"type": "string"},
                }),
                &["title", "body"],
            ),
        ),
        def(
            "mutate_premise",
            "Stage a premise derived from mutating an earlier one.",
            obj(
                json!({
                    "source_title": {"type": "string"},
                    "source_body": {"type": "string"},
                    "title": {"type": "string"},
                    "body": {"type": "string"},
                    "premise_type": {"type": "string", "enum": ["initial", "conservative", "radical", "combination"]},
                    "mutation_strength": {"type": "number", "minimum": 0.1, "maximum": 1.0},
                    "violated_axiom": {"type": "string"},
                    "cross_domain_source": {"type": "string"},
                }),
                &["source_title", "title", "body", "mutation_strength"],
            ),
        ),
        def(
            "cross_pollinate",
            "Stage a premise synthesized from two or more earlier premises.",
            obj(
                json!({
                    "primary_title": {"type": "string"},
                    "primary_body": {"type": "string"},
                    "secondary_premises": {"type": "array", "items": {"type": "string"}},
                    "title": {"type": "string"},
                    "body": {"type": "string"},
                    "premise_type": {"type": "string", "enum": ["initial", "conservative", "radical", "combination"]},
                    "synthesis_strategy": {"type": "string"},
                    "violated_axiom": {"type": "string"},
                    "cross_domain_source": {"type": "string"},
                }),
                &["primary_title", "secondary_premises", "title", "body", "synthesis_strategy"],
            ),
        ),
        def(
            "challenge_axiom",
            "Deliberately violate a previously extracted axiom to unlock radical premises.",
            obj(
                json!({
                    "axiom": {"type": "string"},
                    "violation_strategy": {"type": "string", "enum": ["negate", "invert", "remove", "replace", "exaggerate"]},
                    "resulting_insight": {"type": "string"},
                }),
                &["axiom", "violation_strategy", "resulting_insight"],
            ),
        ),
        def(
            "import_foreign_domain",
            "Translate an analogy from an unrelated domain into this problem's terms.",
            obj(
                json!({
                    "problem_domain": {"type": "string"},
                    "source_domain": {"type": "string"},
                    "analogy_seed": {"type": "string"},
                    "translated_insight": {"type": "string"},
                }),
                &["problem_domain", "source_domain", "analogy_seed", "translated_insight"],
            ),
        ),
        def(
            "obviousness_test",
            "Score how obvious a buffered premise is; scores above 0.6 are discarded.",
            obj(
                json!({
                    "premise_buffer_index": {"type": "integer", "minimum": 0},
                    "premise_title": {"type": "string"},
                    "obviousness_score": {"type": "number", "minimum": 0.0, "maximum": 1.0},
                    "justification": {"type": "string"},
                }),
                &["premise_buffer_index", "premise_title", "obviousness_score", "justification"],
            ),
        ),
        def(
            "invert_problem",
            "Reframe the problem by inverting it, and note any insights surfaced by doing so.",
            obj(
                json!({
                    "original_problem": {"type": "string"},
                    "inversion_type": {"type": "string"},
                    "inverted_framing": {"type": "string"},
                    "insights": {"type": "array", "items": {"type": "string"}},
                }),
                &["original_problem", "inversion_type", "inverted_framing"],
            ),
        ),
        def(
            "ask_user",
            "Pause the session and ask the human collaborator a clarifying question.",
            obj(
                json!({
                    "question": {"type": "string"},
                    "options": {
                        "type": "array",
                        "minItems": 2,
                        "maxItems": 5,
                        "items": {
                            "type": "object",
                            "properties": {
                                "label": {"type": "string"},
                                "description": {"type": "string"},
                            },
                            "required": ["label"],
                        },
                    },
                    "allow_free_text": {"type": "boolean"},
                    "context": {"type": "string"},
                }),
                &["question", "options"],
            ),
        ),
        def(
            "present_round",
            "Commit the current round's three buffered premises and pause for the human's scores.",
            obj(json!({"round_summary": {"type": "string"}}), &[]),
        ),
        def(
            "generate_final_spec",
            "Produce the final Markdown specification from the winning premise, once the human has requested resolution.",
            obj(
                json!({
                    "winning_premise_title": {"type": "string"},
                    "winning_premise_body": {"type": "string"},
                    "winning_score": {"type": "number"},
                    "problem_statement": {"type": "string"},
                    "evolution_summary": {"type": "string"},
                    "spec_content": {"type": "string"},
                }),
                &["winning_premise_title", "winning_premise_body", "problem_statement", "spec_content"],
            ),
        ),
        def(
            "store_premise",
            "Overlay a user evaluation (score, comment, winner flag) onto a previously presented premise.",
            obj(
                json!({
                    "title": {"type": "string"},
                    "premise_type": {"type": "string"},
                    "round_number": {"type": "integer"},
                    "body": {"type": "string"},
                    "score": {"type": "number", "minimum": 0.0, "maximum": 10.0},
                    "user_comment": {"type": "string"},
                    "is_winner": {"type": "boolean"},
                }),
                &["title", "premise_type", "round_number"],
            ),
        ),
        def(
            "query_premises",
            "Read back previously persisted premises for this session under a named filter.",
            obj(
                json!({
                    "filter": {"type": "string", "enum": ["all", "winners", "top_scored", "low_scored", "by_type", "by_round"]},
                    "premise_type": {"type": "string"},
                    "round_number": {"type": "integer"},
                    "limit": {"type": "integer", "default": 10},
                }),
                &["filter"],
            ),
        ),
        def(
            "get_negative_context",
            "Fetch previously low-scored premises to avoid repeating them. Required once per round from round 2 onward.",
            obj(json!({}), &[]),
        ),
        def(
            "get_context_usage",
            "Report how much of the session's token budget has been spent and how many rounds likely remain.",
            obj(json!({}), &[]),
        ),
    ]
}
