//! Tool Handlers & Tool Dispatch: the seventeen typed handlers the agent loop
//! invokes on the LLM's behalf, grouped into five categories, plus the
//! explicit name-to-handler table from §4.6.
//!
//! Every handler follows read→pure-validate→write and returns
//! `Result<ToolOutcome, GhostPathError>`. Handlers never need to distinguish
//! "business rule" from "infrastructure" failure at the call site: both are
//! `Err(GhostPathError)`, and [`dispatch::dispatch`] uniformly flattens any
//! `Err` into the tagged `{status, error_code, message, ...}` dict from
//! §4.5/§7 via [`crate::error::GhostPathError::to_tool_result`]. This is the
//! idiomatic-Rust rendering of the source's "handlers never raise, the
//! dispatcher catches" contract: `Result` *is* the tagged-result channel.

pub mod analysis;
pub mod dispatch;
pub mod generation;
pub mod innovation;
pub mod interaction;
pub mod memory;
pub mod schema;

use serde_json::Value;
use uuid::Uuid;

use crate::config::Settings;
use crate::error::{ErrorContext, GhostPathError};
use crate::session::SessionState;
use crate::store::StorePort;

pub use dispatch::{dispatch, TOOL_NAMES};
pub use schema::tool_definitions;

/// A tool handler's JSON-serializable return value: `{status, ...}`.
pub type ToolOutcome = Value;

/// Everything a handler needs: the durable store, the session's ephemeral
/// in-memory state (held under the per-session turn lock), and process
/// settings. Borrowed for the duration of one tool call.
pub struct ToolContext<'a> {
    pub session_id: Uuid,
    pub state: &'a mut SessionState,
    pub store: &'a dyn StorePort,
    pub settings: &'a Settings,
}

fn validation_error(message: impl Into<String>) -> GhostPathError {
    GhostPathError::ValidationError {
        message: message.into(),
        context: ErrorContext::new(),
    }
}

pub(crate) fn require_str(input: &Value, field: &str) -> Result<String, GhostPathError> {
    input
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| validation_error(format!("`{field}` is required")))
}

pub(crate) fn optional_str(input: &Value, field: &str) -> Option<String> {
    input
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
}

pub(crate) fn require_f64(input: &Value, field: &str) -> Result<f64, GhostPathError> {
    input
        .get(field)
        .and_then(Value::as_f64)
        .ok_or_else(|| validation_error(format!("`{field}` is required and must be numeric")))
}

pub(crate) fn optional_f64(input: &Value, field: &str) -> Option<f64> {
    input.get(field).and_then(Value::as_f64)
}

pub(crate) fn require_usize(input: &Value, field: &str) -> Result<usize, GhostPathError> {
    input
        .get(field)
        .and_then(Value::as_u64)
        .map(|v| v as usize)
        .ok_or_else(|| validation_error(format!("`{field}` is required and must be a non-negative integer")))
}

pub(crate) fn require_str_array(input: &Value, field: &str) -> Result<Vec<String>, GhostPathError> {
    input
        .get(field)
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .ok_or_else(|| validation_error(format!("`{field}` is required and must be an array of strings")))
}

pub(crate) fn optional_str_array(input: &Value, field: &str) -> Vec<String> {
    input
        .get(field)
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

pub(crate) fn require_title(input: &Value, field: &str) -> Result<String, GhostPathError> {
    let title = require_str(input, field)?;
    crate::store::models::validate_title(&title).map_err(validation_error)?;
    Ok(title)
}

/// Shared test fixtures for tool-handler unit tests: an in-memory
/// [`StorePort`] double standing in for Postgres, plus a default [`Settings`]
/// builder. Kept here so `interaction`/`memory` tests don't each reimplement
/// the premise bookkeeping a live store would do.
#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use uuid::Uuid;

    use crate::config::{LogFormat, Settings};
    use crate::error::GhostPathError;
    use crate::store::models::{Premise, Session, SessionStatus};
    use crate::store::{BufferedPremise, PremiseQueryFilter, StorePort};

    pub(crate) fn test_settings() -> Settings {
        Settings {
            database_url: "postgres://localhost/test".into(),
            llm_api_key: "key".into(),
            llm_model: "claude-opus-4-1".into(),
            db_pool_max_connections: 1,
            db_pool_min_connections: 1,
            db_pool_acquire_timeout: std::time::Duration::from_secs(1),
            llm_max_retries: 3,
            llm_base_delay: std::time::Duration::from_millis(1),
            llm_max_delay: std::time::Duration::from_millis(10),
            llm_request_timeout: std::time::Duration::from_secs(1),
            agent_max_iterations: 50,
            cors_allowed_origins: vec![],
            log_level: "info".into(),
            log_format: LogFormat::Auto,
            spec_artifact_dir: "/tmp".into(),
            http_bind_addr: "0.0.0.0:8080".parse().unwrap(),
        }
    }

    #[derive(Default)]
    pub(crate) struct InMemoryStore {
        pub premises: Mutex<Vec<Premise>>,
        pub rounds: Mutex<i64>,
        pub session: Mutex<Option<Session>>,
    }

    impl InMemoryStore {
        pub fn with_session(token_count: i64) -> Self {
            let session = Session {
                id: Uuid::new_v4(),
                problem: "test problem".into(),
                status: SessionStatus::Active,
                created_at: chrono::Utc::now(),
                resolved_at: None,
                token_count,
                message_history: serde_json::json!([]),
                analysis: serde_json::json!({}),
                spec_content: None,
            };
            Self {
                premises: Mutex::new(Vec::new()),
                rounds: Mutex::new(0),
                session: Mutex::new(Some(session)),
            }
        }
    }

    #[async_trait]
    impl StorePort for InMemoryStore {
        async fn health_probe(&self) -> bool {
            true
        }
        async fn create_session(&self, _problem: &str) -> Result<Session, GhostPathError> {
            unimplemented!()
        }
        async fn get_session(&self, _id: Uuid) -> Result<Option<Session>, GhostPathError> {
            Ok(self.session.lock().unwrap().clone())
        }
        async fn list_sessions(
            &self,
            _limit: i64,
            _offset: i64,
            _status: Option<SessionStatus>,
        ) -> Result<Vec<Session>, GhostPathError> {
            unimplemented!()
        }
        async fn delete_session(&self, _id: Uuid) -> Result<u64, GhostPathError> {
            unimplemented!()
        }
        async fn set_session_status(
            &self,
            _id: Uuid,
            status: SessionStatus,
            resolved_at: Option<chrono::DateTime<chrono::Utc>>,
        ) -> Result<(), GhostPathError> {
            if let Some(session) = self.session.lock().unwrap().as_mut() {
                session.status = status;
                session.resolved_at = resolved_at;
            }
            Ok(())
        }
        async fn update_session_turn(
            &self,
            _id: Uuid,
            _token_count: i64,
            _message_history: &serde_json::Value,
        ) -> Result<(), GhostPathError> {
            unimplemented!()
        }
        async fn record_analysis(
            &self,
            _id: Uuid,
            _gate_key: &str,
            _payload: &serde_json::Value,
        ) -> Result<(), GhostPathError> {
            Ok(())
        }
        async fn resolve_session(
            &self,
            _id: Uuid,
            resolved_at: chrono::DateTime<chrono::Utc>,
            spec_content: &str,
        ) -> Result<(), GhostPathError> {
            if let Some(session) = self.session.lock().unwrap().as_mut() {
                session.resolved_at = Some(resolved_at);
                session.spec_content = Some(spec_content.to_string());
            }
            Ok(())
        }
        async fn present_round(
            &self,
            session_id: Uuid,
            round_number: i64,
            buffer: &[BufferedPremise],
        ) -> Result<Vec<Premise>, GhostPathError> {
            *self.rounds.lock().unwrap() += 1;
            let created: Vec<Premise> = buffer
                .iter()
                .map(|b| Premise {
                    id: Uuid::new_v4(),
                    session_id,
                    round_number,
                    title: b.title.clone(),
                    body: b.body.clone(),
                    premise_type: b.premise_type,
                    violated_axiom: b.violated_axiom.clone(),
                    cross_domain_source: b.cross_domain_source.clone(),
                    score: None,
                    user_comment: None,
                    is_winner: false,
                })
                .collect();
            self.premises.lock().unwrap().extend(created.clone());
            Ok(created)
        }
        async fn find_premise_by_title(
            &self,
            _session_id: Uuid,
            title: &str,
        ) -> Result<Option<Premise>, GhostPathError> {
            Ok(self
                .premises
                .lock()
                .unwrap()
                .iter()
                .rev()
                .find(|p| p.title == title)
                .cloned())
        }
        async fn overlay_premise_evaluation(
            &self,
            premise_id: Uuid,
            score: Option<f64>,
            user_comment: Option<&str>,
            is_winner: bool,
        ) -> Result<(), GhostPathError> {
            if let Some(p) = self
                .premises
                .lock()
                .unwrap()
                .iter_mut()
                .find(|p| p.id == premise_id)
            {
                p.score = score;
                p.user_comment = user_comment.map(str::to_string);
                p.is_winner = is_winner;
            }
            Ok(())
        }
        async fn query_premises(
            &self,
            _session_id: Uuid,
            filter: PremiseQueryFilter,
            limit: i64,
        ) -> Result<Vec<Premise>, GhostPathError> {
            let premises = self.premises.lock().unwrap();
            let mut filtered: Vec<Premise> = match filter {
                PremiseQueryFilter::All => premises.clone(),
                PremiseQueryFilter::Winners => {
                    premises.iter().filter(|p| p.is_winner).cloned().collect()
                }
                PremiseQueryFilter::TopScored => {
                    let mut v: Vec<Premise> =
                        premises.iter().filter(|p| p.score.is_some()).cloned().collect();
                    v.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
                    v
                }
                PremiseQueryFilter::LowScored => {
                    premises.iter().filter(|p| p.is_low_scored()).cloned().collect()
                }
                PremiseQueryFilter::ByType(t) => {
                    premises.iter().filter(|p| p.premise_type == t).cloned().collect()
                }
                PremiseQueryFilter::ByRound(r) => {
                    premises.iter().filter(|p| p.round_number == r).cloned().collect()
                }
            };
            filtered.truncate(limit as usize);
            Ok(filtered)
        }
        async fn negative_context(&self, _session_id: Uuid) -> Result<Vec<Premise>, GhostPathError> {
            Ok(self
                .premises
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.is_low_scored())
                .cloned()
                .collect())
        }
        async fn count_rounds(&self, _session_id: Uuid) -> Result<i64, GhostPathError> {
            Ok(*self.rounds.lock().unwrap())
        }
    }
}
