//! Shared integration-test double for [`ghostpath::StorePort`].
//!
//! Lives under `tests/support` (not `tests/support.rs`) so it isn't itself
//! picked up as a standalone test binary; each integration test file pulls it
//! in with `mod support;`.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ghostpath::error::GhostPathError;
use ghostpath::store::models::{Premise, Session, SessionStatus};
use ghostpath::store::{BufferedPremise, PremiseQueryFilter, StorePort};
use uuid::Uuid;

/// An in-memory stand-in for the Postgres-backed [`ghostpath::store::Store`],
/// sized for exercising one or a handful of sessions per test.
#[derive(Default)]
pub struct InMemoryStore {
    sessions: Mutex<HashMap<Uuid, Session>>,
    premises: Mutex<Vec<Premise>>,
    rounds: Mutex<HashMap<Uuid, i64>>,
}

impl InMemoryStore {
    /// Seeds a single `active` session with the given starting token count
    /// and returns it alongside the store, for agent-loop tests that need a
    /// session id up front rather than going through `create_session`.
    pub fn with_session(token_count: i64) -> (Self, Session) {
        let session = Session {
            id: Uuid::new_v4(),
            problem: "How should a small team schedule on-call rotations fairly?".into(),
            status: SessionStatus::Active,
            created_at: Utc::now(),
            resolved_at: None,
            token_count,
            message_history: serde_json::json!([]),
            analysis: serde_json::json!({}),
            spec_content: None,
        };
        let store = Self::default();
        store.sessions.lock().unwrap().insert(session.id, session.clone());
        (store, session)
    }
}

#[async_trait]
impl StorePort for InMemoryStore {
    async fn health_probe(&self) -> bool {
        true
    }

    async fn create_session(&self, problem: &str) -> Result<Session, GhostPathError> {
        let session = Session {
            id: Uuid::new_v4(),
            problem: problem.to_string(),
            status: SessionStatus::Created,
            created_at: Utc::now(),
            resolved_at: None,
            token_count: 0,
            message_history: serde_json::json!([]),
            analysis: serde_json::json!({}),
            spec_content: None,
        };
        self.sessions.lock().unwrap().insert(session.id, session.clone());
        Ok(session)
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<Session>, GhostPathError> {
        Ok(self.sessions.lock().unwrap().get(&id).cloned())
    }

    async fn list_sessions(
        &self,
        limit: i64,
        offset: i64,
        status: Option<SessionStatus>,
    ) -> Result<Vec<Session>, GhostPathError> {
        let mut sessions: Vec<Session> = self
            .sessions
            .lock()
            .unwrap()
            .values()
            .filter(|s| status.map(|st| st == s.status).unwrap_or(true))
            .cloned()
            .collect();
        sessions.sort_by_key(|s| s.created_at);
        sessions.reverse();
        Ok(sessions
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn delete_session(&self, id: Uuid) -> Result<u64, GhostPathError> {
        Ok(self.sessions.lock().unwrap().remove(&id).map(|_| 1).unwrap_or(0))
    }

    async fn set_session_status(
        &self,
        id: Uuid,
        status: SessionStatus,
        resolved_at: Option<DateTime<Utc>>,
    ) -> Result<(), GhostPathError> {
        if let Some(session) = self.sessions.lock().unwrap().get_mut(&id) {
            session.status = status;
            session.resolved_at = resolved_at;
        }
        Ok(())
    }

    async fn update_session_turn(
        &self,
        id: Uuid,
        token_count: i64,
        message_history: &serde_json::Value,
    ) -> Result<(), GhostPathError> {
        if let Some(session) = self.sessions.lock().unwrap().get_mut(&id) {
            session.token_count = token_count;
            session.message_history = message_history.clone();
        }
        Ok(())
    }

    async fn record_analysis(
        &self,
        id: Uuid,
        gate_key: &str,
        payload: &serde_json::Value,
    ) -> Result<(), GhostPathError> {
        if let Some(session) = self.sessions.lock().unwrap().get_mut(&id) {
            if let Some(obj) = session.analysis.as_object_mut() {
                obj.insert(gate_key.to_string(), payload.clone());
            }
        }
        Ok(())
    }

    async fn resolve_session(
        &self,
        id: Uuid,
        resolved_at: DateTime<Utc>,
        spec_content: &str,
    ) -> Result<(), GhostPathError> {
        if let Some(session) = self.sessions.lock().unwrap().get_mut(&id) {
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
        *self.rounds.lock().unwrap().entry(session_id).or_insert(0) += 1;
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
        session_id: Uuid,
        title: &str,
    ) -> Result<Option<Premise>, GhostPathError> {
        Ok(self
            .premises
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|p| p.session_id == session_id && p.title == title)
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
        session_id: Uuid,
        filter: PremiseQueryFilter,
        limit: i64,
    ) -> Result<Vec<Premise>, GhostPathError> {
        let premises = self.premises.lock().unwrap();
        let mut filtered: Vec<Premise> = premises
            .iter()
            .filter(|p| p.session_id == session_id)
            .filter(|p| match filter {
                PremiseQueryFilter::All => true,
                PremiseQueryFilter::Winners => p.is_winner,
                PremiseQueryFilter::TopScored => p.score.is_some(),
                PremiseQueryFilter::LowScored => p.is_low_scored(),
                PremiseQueryFilter::ByType(t) => p.premise_type == t,
                PremiseQueryFilter::ByRound(r) => p.round_number == r,
            })
            .cloned()
            .collect();
        if matches!(filter, PremiseQueryFilter::TopScored) {
            filtered.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
        }
        filtered.truncate(limit.max(0) as usize);
        Ok(filtered)
    }

    async fn negative_context(&self, session_id: Uuid) -> Result<Vec<Premise>, GhostPathError> {
        Ok(self
            .premises
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.session_id == session_id && p.is_low_scored())
            .cloned()
            .collect())
    }

    async fn count_rounds(&self, session_id: Uuid) -> Result<i64, GhostPathError> {
        Ok(*self.rounds.lock().unwrap().get(&session_id).unwrap_or(&0))
    }
}

pub fn test_settings() -> ghostpath::Settings {
    ghostpath::Settings {
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
        log_level: "error".into(),
        log_format: ghostpath::config::LogFormat::Auto,
        spec_artifact_dir: std::env::temp_dir().to_string_lossy().into_owned(),
        http_bind_addr: "0.0.0.0:0".parse().unwrap(),
    }
}
