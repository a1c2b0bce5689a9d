//! Store Adapter: a pooled async connection to the durable relational store,
//! with pre-ping, auto-rollback on error, and a health probe.

pub mod models;

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;
use uuid::Uuid;

use crate::error::GhostPathError;
use models::{Premise, PremiseType, Session, SessionStatus};

/// Storage operations the rest of the runtime depends on, abstracted behind
/// a trait (mirroring [`crate::llm::ClientWrapper`]) so tool handlers and the
/// agent loop can be exercised in tests against an in-memory double instead
/// of a live Postgres instance.
#[async_trait]
pub trait StorePort: Send + Sync {
    async fn health_probe(&self) -> bool;
    async fn create_session(&self, problem: &str) -> Result<Session, GhostPathError>;
    async fn get_session(&self, id: Uuid) -> Result<Option<Session>, GhostPathError>;
    async fn list_sessions(
        &self,
        limit: i64,
        offset: i64,
        status: Option<SessionStatus>,
    ) -> Result<Vec<Session>, GhostPathError>;
    async fn delete_session(&self, id: Uuid) -> Result<u64, GhostPathError>;
    async fn set_session_status(
        &self,
        id: Uuid,
        status: SessionStatus,
        resolved_at: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<(), GhostPathError>;
    async fn update_session_turn(
        &self,
        id: Uuid,
        token_count: i64,
        message_history: &serde_json::Value,
    ) -> Result<(), GhostPathError>;
    async fn record_analysis(
        &self,
        id: Uuid,
        gate_key: &str,
        payload: &serde_json::Value,
    ) -> Result<(), GhostPathError>;
    async fn resolve_session(
        &self,
        id: Uuid,
        resolved_at: chrono::DateTime<chrono::Utc>,
        spec_content: &str,
    ) -> Result<(), GhostPathError>;
    async fn present_round(
        &self,
        session_id: Uuid,
        round_number: i64,
        buffer: &[BufferedPremise],
    ) -> Result<Vec<Premise>, GhostPathError>;
    async fn find_premise_by_title(
        &self,
        session_id: Uuid,
        title: &str,
    ) -> Result<Option<Premise>, GhostPathError>;
    async fn overlay_premise_evaluation(
        &self,
        premise_id: Uuid,
        score: Option<f64>,
        user_comment: Option<&str>,
        is_winner: bool,
    ) -> Result<(), GhostPathError>;
    async fn query_premises(
        &self,
        session_id: Uuid,
        filter: PremiseQueryFilter,
        limit: i64,
    ) -> Result<Vec<Premise>, GhostPathError>;
    async fn negative_context(&self, session_id: Uuid) -> Result<Vec<Premise>, GhostPathError>;
    async fn count_rounds(&self, session_id: Uuid) -> Result<i64, GhostPathError>;
}

/// Thin wrapper around a `sqlx::PgPool`.
///
/// `sqlx::PgPool` already pre-pings on checkout (it tests the connection with
/// a cheap round trip before handing it to the caller) and the pool evicts
/// broken connections automatically, so this adapter's job is narrower than
/// the upstream pattern's: map storage faults into [`GhostPathError`] and
/// expose a health probe, while every multi-statement write runs inside an
/// explicit transaction that is rolled back on any error (auto-rollback is
/// `Drop`-based: an un-committed `sqlx::Transaction` rolls back when it goes
/// out of scope on any exit path, including `?`-propagated errors).
#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, GhostPathError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await
            .map_err(|e| GhostPathError::database("connect", e.to_string()))?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl StorePort for Store {
    /// Issue a trivial query and report whether the store is reachable.
    /// Never returns an error: failures are folded into `false` so the
    /// readiness endpoint can answer with a plain boolean.
    async fn health_probe(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }

    async fn create_session(&self, problem: &str) -> Result<Session, GhostPathError> {
        let row = sqlx::query(
            r#"
            INSERT INTO sessions (id, problem, status, created_at, token_count, message_history, analysis)
            VALUES (gen_random_uuid(), $1, 'created', now(), 0, '[]'::jsonb, '{}'::jsonb)
            RETURNING id, problem, status, created_at, resolved_at, token_count, message_history, analysis, spec_content
            "#,
        )
        .bind(problem)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| GhostPathError::database("create_session", e.to_string()))?;
        Ok(row_to_session(&row))
    }

    async fn get_session(&self, id: uuid::Uuid) -> Result<Option<Session>, GhostPathError> {
        let row = sqlx::query(
            r#"
            SELECT id, problem, status, created_at, resolved_at, token_count, message_history, analysis, spec_content
            FROM sessions WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| GhostPathError::database("get_session", e.to_string()))?;
        Ok(row.map(|r| row_to_session(&r)))
    }

    async fn list_sessions(
        &self,
        limit: i64,
        offset: i64,
        status: Option<SessionStatus>,
    ) -> Result<Vec<Session>, GhostPathError> {
        let rows = if let Some(status) = status {
            sqlx::query(
                r#"
                SELECT id, problem, status, created_at, resolved_at, token_count, message_history, analysis, spec_content
                FROM sessions WHERE status = $1
                ORDER BY created_at DESC LIMIT $2 OFFSET $3
                "#,
            )
            .bind(status.as_str())
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query(
                r#"
                SELECT id, problem, status, created_at, resolved_at, token_count, message_history, analysis, spec_content
                FROM sessions ORDER BY created_at DESC LIMIT $1 OFFSET $2
                "#,
            )
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
        }
        .map_err(|e| GhostPathError::database("list_sessions", e.to_string()))?;

        Ok(rows.iter().map(row_to_session).collect())
    }

    async fn delete_session(&self, id: uuid::Uuid) -> Result<u64, GhostPathError> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| GhostPathError::database("delete_session", e.to_string()))?;
        Ok(result.rows_affected())
    }

    async fn set_session_status(
        &self,
        id: uuid::Uuid,
        status: SessionStatus,
        resolved_at: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<(), GhostPathError> {
        sqlx::query("UPDATE sessions SET status = $1, resolved_at = $2 WHERE id = $3")
            .bind(status.as_str())
            .bind(resolved_at)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| GhostPathError::database("set_session_status", e.to_string()))?;
        Ok(())
    }

    async fn update_session_turn(
        &self,
        id: uuid::Uuid,
        token_count: i64,
        message_history: &serde_json::Value,
    ) -> Result<(), GhostPathError> {
        sqlx::query("UPDATE sessions SET token_count = $1, message_history = $2 WHERE id = $3")
            .bind(token_count)
            .bind(message_history)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| GhostPathError::database("update_session_turn", e.to_string()))?;
        Ok(())
    }

    /// Merge `payload` into the session's `analysis` JSON object under
    /// `gate_key`, recording what an analysis gate handler produced.
    async fn record_analysis(
        &self,
        id: uuid::Uuid,
        gate_key: &str,
        payload: &serde_json::Value,
    ) -> Result<(), GhostPathError> {
        sqlx::query(
            "UPDATE sessions SET analysis = jsonb_set(analysis, $1, $2, true) WHERE id = $3",
        )
        .bind(vec![gate_key.to_string()])
        .bind(payload)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| GhostPathError::database("record_analysis", e.to_string()))?;
        Ok(())
    }

    /// Mark a session resolved and persist the final spec artifact text.
    async fn resolve_session(
        &self,
        id: uuid::Uuid,
        resolved_at: chrono::DateTime<chrono::Utc>,
        spec_content: &str,
    ) -> Result<(), GhostPathError> {
        sqlx::query(
            "UPDATE sessions SET status = 'resolved', resolved_at = $1, spec_content = $2 WHERE id = $3",
        )
        .bind(resolved_at)
        .bind(spec_content)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| GhostPathError::database("resolve_session", e.to_string()))?;
        Ok(())
    }

    /// Create a Round and exactly three Premise records atomically. The
    /// buffer passed in is the source of truth (never re-submitted
    /// arguments). Rolls back entirely on any failure.
    async fn present_round(
        &self,
        session_id: uuid::Uuid,
        round_number: i64,
        buffer: &[BufferedPremise],
    ) -> Result<Vec<Premise>, GhostPathError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| GhostPathError::database("present_round.begin", e.to_string()))?;

        sqlx::query("INSERT INTO rounds (session_id, round_number, created_at) VALUES ($1, $2, now())")
            .bind(session_id)
            .bind(round_number)
            .execute(&mut *tx)
            .await
            .map_err(|e| GhostPathError::database("present_round.insert_round", e.to_string()))?;

        let mut created = Vec::with_capacity(buffer.len());
        for premise in buffer {
            let row = sqlx::query(
                r#"
                INSERT INTO premises
                    (id, session_id, round_number, title, body, premise_type,
                     violated_axiom, cross_domain_source, score, user_comment, is_winner)
                VALUES (gen_random_uuid(), $1, $2, $3, $4, $5, $6, $7, NULL, NULL, false)
                RETURNING id, session_id, round_number, title, body, premise_type,
                          violated_axiom, cross_domain_source, score, user_comment, is_winner
                "#,
            )
            .bind(session_id)
            .bind(round_number)
            .bind(&premise.title)
            .bind(&premise.body)
            .bind(premise.premise_type.as_str())
            .bind(&premise.violated_axiom)
            .bind(&premise.cross_domain_source)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| GhostPathError::database("present_round.insert_premise", e.to_string()))?;
            created.push(row_to_premise(&row));
        }

        tx.commit()
            .await
            .map_err(|e| GhostPathError::database("present_round.commit", e.to_string()))?;

        Ok(created)
    }

    async fn find_premise_by_title(
        &self,
        session_id: uuid::Uuid,
        title: &str,
    ) -> Result<Option<Premise>, GhostPathError> {
        let row = sqlx::query(
            r#"
            SELECT id, session_id, round_number, title, body, premise_type,
                   violated_axiom, cross_domain_source, score, user_comment, is_winner
            FROM premises WHERE session_id = $1 AND title = $2
            ORDER BY round_number DESC LIMIT 1
            "#,
        )
        .bind(session_id)
        .bind(title)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| GhostPathError::database("find_premise_by_title", e.to_string()))?;
        Ok(row.map(|r| row_to_premise(&r)))
    }

    async fn overlay_premise_evaluation(
        &self,
        premise_id: uuid::Uuid,
        score: Option<f64>,
        user_comment: Option<&str>,
        is_winner: bool,
    ) -> Result<(), GhostPathError> {
        sqlx::query(
            "UPDATE premises SET score = $1, user_comment = $2, is_winner = $3 WHERE id = $4",
        )
        .bind(score)
        .bind(user_comment)
        .bind(is_winner)
        .bind(premise_id)
        .execute(&self.pool)
        .await
        .map_err(|e| GhostPathError::database("overlay_premise_evaluation", e.to_string()))?;
        Ok(())
    }

    async fn query_premises(
        &self,
        session_id: uuid::Uuid,
        filter: PremiseQueryFilter,
        limit: i64,
    ) -> Result<Vec<Premise>, GhostPathError> {
        let rows = match filter {
            PremiseQueryFilter::All => {
                sqlx::query(
                    r#"SELECT id, session_id, round_number, title, body, premise_type,
                       violated_axiom, cross_domain_source, score, user_comment, is_winner
                       FROM premises WHERE session_id = $1 ORDER BY round_number, title LIMIT $2"#,
                )
                .bind(session_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            PremiseQueryFilter::Winners => {
                sqlx::query(
                    r#"SELECT id, session_id, round_number, title, body, premise_type,
                       violated_axiom, cross_domain_source, score, user_comment, is_winner
                       FROM premises WHERE session_id = $1 AND is_winner = true
                       ORDER BY round_number LIMIT $2"#,
                )
                .bind(session_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            PremiseQueryFilter::TopScored => {
                sqlx::query(
                    r#"SELECT id, session_id, round_number, title, body, premise_type,
                       violated_axiom, cross_domain_source, score, user_comment, is_winner
                       FROM premises WHERE session_id = $1 AND score IS NOT NULL
                       ORDER BY score DESC LIMIT $2"#,
                )
                .bind(session_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            PremiseQueryFilter::LowScored => {
                sqlx::query(
                    r#"SELECT id, session_id, round_number, title, body, premise_type,
                       violated_axiom, cross_domain_source, score, user_comment, is_winner
                       FROM premises WHERE session_id = $1 AND score < 5.0
                       ORDER BY score ASC LIMIT $2"#,
                )
                .bind(session_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            PremiseQueryFilter::ByType(premise_type) => {
                sqlx::query(
                    r#"SELECT id, session_id, round_number, title, body, premise_type,
                       violated_axiom, cross_domain_source, score, user_comment, is_winner
                       FROM premises WHERE session_id = $1 AND premise_type = $2
                       ORDER BY round_number LIMIT $3"#,
                )
                .bind(session_id)
                .bind(premise_type.as_str())
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            PremiseQueryFilter::ByRound(round_number) => {
                sqlx::query(
                    r#"SELECT id, session_id, round_number, title, body, premise_type,
                       violated_axiom, cross_domain_source, score, user_comment, is_winner
                       FROM premises WHERE session_id = $1 AND round_number = $2
                       ORDER BY title LIMIT $3"#,
                )
                .bind(session_id)
                .bind(round_number)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| GhostPathError::database("query_premises", e.to_string()))?;

        Ok(rows.iter().map(row_to_premise).collect())
    }

    async fn negative_context(
        &self,
        session_id: uuid::Uuid,
    ) -> Result<Vec<Premise>, GhostPathError> {
        let rows = sqlx::query(
            r#"SELECT id, session_id, round_number, title, body, premise_type,
               violated_axiom, cross_domain_source, score, user_comment, is_winner
               FROM premises WHERE session_id = $1 AND score < 5.0 ORDER BY round_number"#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| GhostPathError::database("negative_context", e.to_string()))?;
        Ok(rows.iter().map(row_to_premise).collect())
    }

    async fn count_rounds(&self, session_id: uuid::Uuid) -> Result<i64, GhostPathError> {
        let count: i64 = sqlx::query_scalar("SELECT count(*) FROM rounds WHERE session_id = $1")
            .bind(session_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| GhostPathError::database("count_rounds", e.to_string()))?;
        Ok(count)
    }
}

/// A premise payload staged in the in-memory buffer, prior to persistence.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BufferedPremise {
    pub title: String,
    pub body: String,
    pub premise_type: PremiseType,
    pub violated_axiom: Option<String>,
    pub cross_domain_source: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub enum PremiseQueryFilter {
    All,
    Winners,
    TopScored,
    LowScored,
    ByType(PremiseType),
    ByRound(i64),
}

fn row_to_session(row: &PgRow) -> Session {
    Session {
        id: row.get("id"),
        problem: row.get("problem"),
        status: SessionStatus::from_str(row.get("status")),
        created_at: row.get("created_at"),
        resolved_at: row.get("resolved_at"),
        token_count: row.get("token_count"),
        message_history: row.get("message_history"),
        analysis: row.get("analysis"),
        spec_content: row.get("spec_content"),
    }
}

fn row_to_premise(row: &PgRow) -> Premise {
    Premise {
        id: row.get("id"),
        session_id: row.get("session_id"),
        round_number: row.get("round_number"),
        title: row.get("title"),
        body: row.get("body"),
        premise_type: PremiseType::from_str(row.get("premise_type")),
        violated_axiom: row.get("violated_axiom"),
        cross_domain_source: row.get("cross_domain_source"),
        score: row.get("score"),
        user_comment: row.get("user_comment"),
        is_winner: row.get("is_winner"),
    }
}
