//! Session CRUD endpoints and the two liveness/readiness probes.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::{ErrorContext, GhostPathError};
use crate::store::models::{Session, SessionStatus};

use super::AppState;

pub async fn health() -> impl IntoResponse {
    StatusCode::OK
}

pub async fn health_ready(State(state): State<AppState>) -> impl IntoResponse {
    if state.store.health_probe().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionBody {
    pub problem: String,
}

fn session_summary(session: &Session) -> serde_json::Value {
    json!({
        "id": session.id,
        "problem": session.problem,
        "status": session.status.as_str(),
    })
}

fn session_record(session: &Session) -> serde_json::Value {
    json!({
        "id": session.id,
        "problem": session.problem,
        "status": session.status.as_str(),
        "created_at": session.created_at,
        "resolved_at": session.resolved_at,
        "token_count": session.token_count,
        "analysis": session.analysis,
        "spec_content": session.spec_content,
    })
}

pub async fn create_session(
    State(state): State<AppState>,
    Json(body): Json<CreateSessionBody>,
) -> Result<impl IntoResponse, GhostPathError> {
    let trimmed = body.problem.trim();
    let len = trimmed.chars().count();
    if !(10..=10_000).contains(&len) {
        return Err(GhostPathError::ValidationError {
            message: format!("`problem` must be 10-10000 characters after trimming, got {len}"),
            context: ErrorContext::new(),
        });
    }

    let session = state.store.create_session(trimmed).await?;
    Ok((StatusCode::CREATED, Json(session_summary(&session))))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
}

pub async fn list_sessions(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, GhostPathError> {
    let limit = query.limit.unwrap_or(10).clamp(1, 100);
    let offset = query.offset.unwrap_or(0).max(0);
    let status = match query.status.as_deref() {
        None => None,
        Some(raw) => Some(parse_status(raw)?),
    };

    let sessions = state.store.list_sessions(limit, offset, status).await?;
    Ok(Json(json!({
        "sessions": sessions.iter().map(session_summary).collect::<Vec<_>>(),
        "limit": limit,
        "offset": offset,
    })))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, GhostPathError> {
    let session = load_session(&state, id).await?;
    Ok(Json(session_record(&session)))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, GhostPathError> {
    let session = load_session(&state, id).await?;
    if session.status == SessionStatus::Active {
        return Err(GhostPathError::ConcurrencyConflict {
            context: ErrorContext::new()
                .with_session_id(id.to_string())
                .with_debug(json!({ "reason": "cannot delete an active session" })),
        });
    }
    state.store.delete_session(id).await?;
    state.registry.remove(id).await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn cancel_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, GhostPathError> {
    let session = load_session(&state, id).await?;
    if session.status != SessionStatus::Active {
        return Err(GhostPathError::ValidationError {
            message: format!("session is `{}`, only `active` sessions can be cancelled", session.status.as_str()),
            context: ErrorContext::new().with_session_id(id.to_string()),
        });
    }
    // `resolved_at` is reserved for the `resolved` status (§3 invariant);
    // cancellation leaves it null.
    state
        .store
        .set_session_status(id, SessionStatus::Cancelled, None)
        .await?;
    state.registry.remove(id).await;
    Ok(Json(json!({ "id": id, "status": "cancelled" })))
}

pub(crate) async fn load_session(state: &AppState, id: Uuid) -> Result<Session, GhostPathError> {
    state
        .store
        .get_session(id)
        .await?
        .ok_or_else(|| GhostPathError::ResourceNotFound {
            message: format!("session {id} not found"),
            context: ErrorContext::new().with_session_id(id.to_string()),
        })
}

fn parse_status(raw: &str) -> Result<SessionStatus, GhostPathError> {
    match raw {
        "created" => Ok(SessionStatus::Created),
        "active" => Ok(SessionStatus::Active),
        "resolved" => Ok(SessionStatus::Resolved),
        "cancelled" => Ok(SessionStatus::Cancelled),
        other => Err(GhostPathError::ValidationError {
            message: format!("unrecognized `status` filter `{other}`"),
            context: ErrorContext::new(),
        }),
    }
}
