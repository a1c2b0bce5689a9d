//! Transport / HTTP Surface (§4.8): the versioned `/api/v1` REST+SSE API
//! the session runtime exposes to a human collaborator's client.
//!
//! Mirrors the SerialAgent gateway's `State<AppState>` + per-route handler
//! module layout: one module per concern (`sessions` for CRUD, `stream` for
//! the two agent-loop-invoking endpoints), assembled into a single
//! [`axum::Router`] here.

pub mod sessions;
pub mod stream;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::agent::AgentLoop;
use crate::config::Settings;
use crate::session::SessionRegistry;
use crate::store::StorePort;

/// Shared state handed to every handler via axum's `State` extractor.
/// Cheap to clone: everything inside is an `Arc` or already clone-cheap.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn StorePort>,
    pub registry: SessionRegistry,
    pub agent: AgentLoop,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(store: Arc<dyn StorePort>, settings: Arc<Settings>) -> Self {
        let registry = SessionRegistry::new();
        let llm = Arc::new(crate::llm::MessagesApiClient::new(
            settings.llm_api_key.clone(),
            settings.llm_model.clone(),
            crate::llm::RetryConfig {
                max_retries: settings.llm_max_retries,
                base_delay: settings.llm_base_delay,
                max_delay: settings.llm_max_delay,
            },
            settings.llm_request_timeout,
        )) as Arc<dyn crate::llm::ClientWrapper>;
        let agent = AgentLoop::new(store.clone(), llm, settings.clone());
        Self { store, registry, agent, settings }
    }
}

/// Build the full router: `/api/v1/...` routes, CORS, and request tracing.
pub fn router(state: AppState) -> Router {
    let cors = if state.settings.cors_allowed_origins.is_empty() {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        let origins: Vec<_> = state
            .settings
            .cors_allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let api = Router::new()
        .route("/health/", get(sessions::health))
        .route("/health/ready", get(sessions::health_ready))
        .route("/sessions", post(sessions::create_session).get(sessions::list_sessions))
        .route(
            "/sessions/{id}",
            get(sessions::get_session).delete(sessions::delete_session),
        )
        .route("/sessions/{id}/cancel", post(sessions::cancel_session))
        .route("/sessions/{id}/stream", get(stream::stream_session))
        .route("/sessions/{id}/user-input", post(stream::submit_user_input))
        .route("/sessions/{id}/spec", get(stream::get_spec))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api)
        .fallback(not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": { "code": "NOT_FOUND", "message": "no such route" } })),
    )
}
