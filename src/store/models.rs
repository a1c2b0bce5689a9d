//! Row types for the durable store, matching the data model's entity shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A creative session: one problem statement worked through to resolution or
/// cancellation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub problem: String,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    /// Non-null iff `status` is `resolved`.
    pub resolved_at: Option<DateTime<Utc>>,
    pub token_count: i64,
    pub message_history: serde_json::Value,
    /// Accumulated payloads from the three analysis gates
    /// (`decompose_problem`, `map_conventional_approaches`,
    /// `extract_hidden_axioms`), keyed by gate name. Durable mirror of the
    /// ephemeral `SessionState::completed_gates` bookkeeping.
    pub analysis: serde_json::Value,
    /// Markdown artifact produced by `generate_final_spec`, once resolved.
    pub spec_content: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Created,
    Active,
    Resolved,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Active => "active",
            Self::Resolved => "resolved",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "active" => Self::Active,
            "resolved" => Self::Resolved,
            "cancelled" => Self::Cancelled,
            _ => Self::Created,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::Cancelled)
    }
}

/// A session-scoped round, 1-based and strictly increasing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round {
    pub session_id: Uuid,
    pub round_number: i64,
}

/// A single generated idea, always created as part of a round's buffer of
/// exactly three.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Premise {
    pub id: Uuid,
    pub session_id: Uuid,
    pub round_number: i64,
    pub title: String,
    pub body: String,
    pub premise_type: PremiseType,
    pub violated_axiom: Option<String>,
    pub cross_domain_source: Option<String>,
    pub score: Option<f64>,
    pub user_comment: Option<String>,
    pub is_winner: bool,
}

impl Premise {
    /// `score < 5.0`, used both to build negative context and to flag a
    /// premise as disappointing to the collaborator.
    pub fn is_low_scored(&self) -> bool {
        self.score.map(|s| s < 5.0).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PremiseType {
    Initial,
    Conservative,
    Radical,
    Combination,
}

impl PremiseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Conservative => "conservative",
            Self::Radical => "radical",
            Self::Combination => "combination",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "conservative" => Self::Conservative,
            "radical" => Self::Radical,
            "combination" => Self::Combination,
            _ => Self::Initial,
        }
    }

    pub fn requires_axiom_challenge(&self) -> bool {
        matches!(self, Self::Radical)
    }
}

/// Validate a premise title against the 1-200 character bound from the data
/// model. Character count, not byte count, so multi-byte titles aren't
/// penalized for their UTF-8 encoding.
pub fn validate_title(title: &str) -> Result<(), String> {
    let len = title.chars().count();
    if len == 0 || len > 200 {
        return Err(format!(
            "title must be 1-200 characters, got {len}"
        ));
    }
    Ok(())
}
