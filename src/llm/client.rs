//! Shared primitives for the LLM Client Wrapper, plus a concrete
//! implementation over a Claude-style Messages API.
//!
//! Applications interact with the wrapper through the [`ClientWrapper`]
//! trait. The data types below describe a single chat turn's request and
//! response shape: system directive, tool list, message history in, and text
//! / tool-invocation / server-tool / tool-result content blocks out, plus a
//! `stop_reason` and token usage counters.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorContext, GhostPathError};
use crate::llm::retry::{
    rate_limited_llm_error, retry_with_backoff, timeout_llm_error, unknown_llm_error, LlmFault,
    RetryConfig,
};

lazy_static! {
    /// Shared `reqwest` client, reused across all LLM calls so connection
    /// pooling and TLS session resumption are effective.
    static ref SHARED_HTTP_CLIENT: reqwest::Client = reqwest::Client::new();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmRole {
    System,
    User,
    Assistant,
}

/// A single block of an LLM message: plain text, a requested tool
/// invocation, a provider-executed ("server") tool invocation, or the result
/// fed back for a prior tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    ToolUse(ToolUse),
    ServerToolUse(ToolUse),
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default)]
        is_error: bool,
    },
}

/// A tool invocation requested by the LLM. `id` correlates the eventual
/// `ContentBlock::ToolResult` back to this call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolUse {
    pub id: String,
    pub name: String,
    pub input: serde_json::Value,
}

/// One message in the conversation history sent to / received from the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmMessage {
    pub role: LlmRole,
    pub content: Vec<ContentBlock>,
}

impl LlmMessage {
    pub fn text(role: LlmRole, text: impl Into<String>) -> Self {
        Self {
            role,
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }
}

/// Provider-agnostic tool schema handed to the LLM alongside a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// Why the LLM stopped generating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    PauseTurn,
    MaxTokens,
    Other(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub server_tool_uses: u64,
}

impl Usage {
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// A full chat request: model, token budget, system directive, available
/// tools, and the message history so far.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub model: String,
    pub max_tokens: u32,
    pub system: String,
    pub tools: Vec<ToolDefinition>,
    pub messages: Vec<LlmMessage>,
    pub error_context: Option<ErrorContext>,
}

/// The LLM's reply to one [`LlmRequest`].
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub stop_reason: StopReason,
    pub usage: Usage,
}

impl LlmResponse {
    pub fn tool_uses(&self) -> Vec<&ToolUse> {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolUse(tu) | ContentBlock::ServerToolUse(tu) => Some(tu),
                _ => None,
            })
            .collect()
    }

    pub fn has_tool_use(&self) -> bool {
        !self.tool_uses().is_empty()
    }
}

/// Trait-driven abstraction for a concrete LLM vendor.
///
/// Implementations must be thread-safe (`Send + Sync`) so they can be shared
/// across async tasks serving concurrent sessions.
#[async_trait]
pub trait ClientWrapper: Send + Sync {
    /// Send a conversation and get the next assistant response, with retry
    /// and timeout handling applied per the policy in §4.2.
    async fn send(&self, request: LlmRequest) -> Result<LlmResponse, GhostPathError>;

    /// Identifier of the upstream model (e.g. `"claude-opus-4-1"`).
    fn model_name(&self) -> &str;
}

/// HTTP-based client for a Claude-style Messages API, wired through the
/// shared retry wrapper.
pub struct MessagesApiClient {
    api_key: String,
    base_url: String,
    model: String,
    retry_config: RetryConfig,
    request_timeout: Duration,
}

impl MessagesApiClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        retry_config: RetryConfig,
        request_timeout: Duration,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.anthropic.com/v1".to_string(),
            model: model.into(),
            retry_config,
            request_timeout,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn send_once(&self, request: &LlmRequest) -> Result<LlmResponse, (LlmFault, GhostPathError)> {
        let body = serde_json::json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "system": request.system,
            "tools": request.tools,
            "messages": request.messages,
        });

        let response = SHARED_HTTP_CLIENT
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_ms = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs * 1_000);
            let message = response.text().await.unwrap_or_default();
            return Err((
                LlmFault::RateLimited { retry_after_ms },
                rate_limited_llm_error(message, retry_after_ms),
            ));
        }
        if status.is_server_error() {
            let message = response.text().await.unwrap_or_default();
            return Err((LlmFault::Transient, unknown_llm_error(message)));
        }
        if status.is_client_error() {
            let message = response.text().await.unwrap_or_default();
            return Err((LlmFault::ClientError, unknown_llm_error(message)));
        }

        let parsed: WireResponse = response
            .json()
            .await
            .map_err(|e| (LlmFault::Unknown, unknown_llm_error(e.to_string())))?;

        Ok(parsed.into())
    }
}

fn classify_transport_error(err: &reqwest::Error) -> (LlmFault, GhostPathError) {
    if err.is_timeout() {
        (LlmFault::Timeout, timeout_llm_error(err.to_string()))
    } else if err.is_connect() {
        (LlmFault::Transient, unknown_llm_error(err.to_string()))
    } else {
        (LlmFault::Unknown, unknown_llm_error(err.to_string()))
    }
}

#[async_trait]
impl ClientWrapper for MessagesApiClient {
    async fn send(&self, request: LlmRequest) -> Result<LlmResponse, GhostPathError> {
        let request = Arc::new(request);
        retry_with_backoff(self.retry_config, {
            let request = request.clone();
            let this = self;
            move || {
                let request = request.clone();
                async move { this.send_once(&request).await }
            }
        })
        .await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    usage: WireUsage,
}

#[derive(Debug, Deserialize, Default)]
struct WireUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
    #[serde(default)]
    server_tool_use: Option<WireServerToolUse>,
}

#[derive(Debug, Deserialize, Default)]
struct WireServerToolUse {
    #[serde(default)]
    web_search_requests: u64,
}

impl From<WireResponse> for LlmResponse {
    fn from(wire: WireResponse) -> Self {
        let stop_reason = match wire.stop_reason.as_deref() {
            Some("end_turn") => StopReason::EndTurn,
            Some("tool_use") => StopReason::ToolUse,
            Some("pause_turn") => StopReason::PauseTurn,
            Some("max_tokens") => StopReason::MaxTokens,
            Some(other) => StopReason::Other(other.to_string()),
            None => StopReason::Other("unknown".to_string()),
        };
        let server_tool_uses = wire
            .usage
            .server_tool_use
            .as_ref()
            .map(|s| s.web_search_requests)
            .unwrap_or(0);
        Self {
            content: wire.content,
            stop_reason,
            usage: Usage {
                input_tokens: wire.usage.input_tokens,
                output_tokens: wire.usage.output_tokens,
                server_tool_uses,
            },
        }
    }
}
