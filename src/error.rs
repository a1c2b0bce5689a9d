//! Typed error hierarchy shared by every layer of the session runtime.
//!
//! A [`GhostPathError`] bundles a stable machine-readable code, a category, a
//! severity, an HTTP status hint, and a free-form [`ErrorContext`] bag. Two
//! serializers are provided: [`GhostPathError::to_rest_envelope`] for HTTP
//! responses and [`GhostPathError::to_stream_envelope`] for the event stream.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Broad classification of a [`GhostPathError`], independent of its exact code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Validation,
    BusinessRule,
    ResourceNotFound,
    Database,
    ExternalApi,
    Internal,
    Conflict,
    Timeout,
}

/// How urgently an error should be surfaced to an operator or end user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

/// Free-form context carried alongside every [`GhostPathError`].
///
/// Fields are populated opportunistically by whichever layer raises the
/// error; none are required.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ErrorContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_number: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<Value>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    pub fn with_tool_name(mut self, name: impl Into<String>) -> Self {
        self.tool_name = Some(name.into());
        self
    }

    pub fn with_round_number(mut self, round: i64) -> Self {
        self.round_number = Some(round);
        self
    }

    pub fn with_retry_after_ms(mut self, ms: u64) -> Self {
        self.retry_after_ms = Some(ms);
        self
    }

    pub fn with_debug(mut self, value: Value) -> Self {
        self.debug = Some(value);
        self
    }
}

/// The full typed error hierarchy for the session runtime.
///
/// One variant per fixed code from the error taxonomy. `category()`,
/// `severity()`, and `http_status()` are derived by matching on the variant
/// so a code can never drift from its classification.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GhostPathError {
    #[error("validation failed: {message}")]
    ValidationError { message: String, context: ErrorContext },

    #[error("required analysis gates not satisfied")]
    GatesNotSatisfied {
        missing_gates: Vec<String>,
        context: ErrorContext,
    },

    #[error("round buffer is full")]
    RoundBufferFull { context: ErrorContext },

    #[error("radical premises require a prior axiom challenge")]
    AxiomNotChallenged { context: ErrorContext },

    #[error("negative context has not been fetched for this round")]
    NegativeContextMissing { context: ErrorContext },

    #[error("round is not complete")]
    IncompleteRound { context: ErrorContext },

    #[error("not all buffered premises have been obviousness-tested")]
    UntestedPremises { context: ErrorContext },

    #[error("premise is too obvious")]
    TooObvious {
        premise_index: usize,
        score: f64,
        context: ErrorContext,
    },

    #[error("buffer index is out of range")]
    InvalidIndex { context: ErrorContext },

    #[error("resource not found: {message}")]
    ResourceNotFound { message: String, context: ErrorContext },

    #[error("database error during {operation}")]
    DatabaseError {
        operation: String,
        message: String,
        context: ErrorContext,
    },

    #[error("LLM API error ({kind}): {message}")]
    LlmApiError {
        kind: String,
        message: String,
        context: ErrorContext,
    },

    #[error("a turn is already in progress for this session")]
    ConcurrencyConflict { context: ErrorContext },

    #[error("agent loop exceeded its iteration cap")]
    AgentLoopExceeded { context: ErrorContext },

    #[error("tool execution failed: {message}")]
    ToolExecutionError { message: String, context: ErrorContext },

    #[error("unknown tool: {tool_name}")]
    UnknownTool { tool_name: String, context: ErrorContext },
}

impl GhostPathError {
    /// Stable machine-readable code, matching the fixed list in the
    /// specification's error taxonomy.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ValidationError { .. } => "VALIDATION_ERROR",
            Self::GatesNotSatisfied { .. } => "GATES_NOT_SATISFIED",
            Self::RoundBufferFull { .. } => "ROUND_BUFFER_FULL",
            Self::AxiomNotChallenged { .. } => "AXIOM_NOT_CHALLENGED",
            Self::NegativeContextMissing { .. } => "NEGATIVE_CONTEXT_MISSING",
            Self::IncompleteRound { .. } => "INCOMPLETE_ROUND",
            Self::UntestedPremises { .. } => "UNTESTED_PREMISES",
            Self::TooObvious { .. } => "TOO_OBVIOUS",
            Self::InvalidIndex { .. } => "INVALID_INDEX",
            Self::ResourceNotFound { .. } => "RESOURCE_NOT_FOUND",
            Self::DatabaseError { .. } => "DATABASE_ERROR",
            Self::LlmApiError { .. } => "LLM_API_ERROR",
            Self::ConcurrencyConflict { .. } => "CONCURRENCY_CONFLICT",
            Self::AgentLoopExceeded { .. } => "AGENT_LOOP_EXCEEDED",
            Self::ToolExecutionError { .. } => "TOOL_EXECUTION_ERROR",
            Self::UnknownTool { .. } => "UNKNOWN_TOOL",
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Self::ValidationError { .. } => Category::Validation,
            Self::GatesNotSatisfied { .. }
            | Self::RoundBufferFull { .. }
            | Self::AxiomNotChallenged { .. }
            | Self::NegativeContextMissing { .. }
            | Self::IncompleteRound { .. }
            | Self::UntestedPremises { .. }
            | Self::TooObvious { .. }
            | Self::InvalidIndex { .. } => Category::BusinessRule,
            Self::ResourceNotFound { .. } => Category::ResourceNotFound,
            Self::DatabaseError { .. } => Category::Database,
            Self::LlmApiError { .. } => Category::ExternalApi,
            Self::ConcurrencyConflict { .. } => Category::Conflict,
            Self::AgentLoopExceeded { .. } | Self::ToolExecutionError { .. } => Category::Internal,
            Self::UnknownTool { .. } => Category::Validation,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::TooObvious { .. } => Severity::Info,
            Self::GatesNotSatisfied { .. }
            | Self::RoundBufferFull { .. }
            | Self::AxiomNotChallenged { .. }
            | Self::NegativeContextMissing { .. }
            | Self::IncompleteRound { .. }
            | Self::UntestedPremises { .. }
            | Self::InvalidIndex { .. }
            | Self::ValidationError { .. }
            | Self::UnknownTool { .. } => Severity::Warning,
            Self::ResourceNotFound { .. } | Self::ConcurrencyConflict { .. } => Severity::Warning,
            Self::DatabaseError { .. } | Self::LlmApiError { .. } => Severity::Error,
            Self::AgentLoopExceeded { .. } | Self::ToolExecutionError { .. } => Severity::Critical,
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::ValidationError { .. }
            | Self::GatesNotSatisfied { .. }
            | Self::RoundBufferFull { .. }
            | Self::AxiomNotChallenged { .. }
            | Self::NegativeContextMissing { .. }
            | Self::IncompleteRound { .. }
            | Self::UntestedPremises { .. }
            | Self::InvalidIndex { .. }
            | Self::UnknownTool { .. } => StatusCode::BAD_REQUEST,
            Self::TooObvious { .. } => StatusCode::OK,
            Self::ResourceNotFound { .. } => StatusCode::NOT_FOUND,
            Self::DatabaseError { .. } | Self::LlmApiError { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::ConcurrencyConflict { .. } => StatusCode::CONFLICT,
            Self::AgentLoopExceeded { .. } | Self::ToolExecutionError { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::ValidationError { context, .. }
            | Self::GatesNotSatisfied { context, .. }
            | Self::RoundBufferFull { context }
            | Self::AxiomNotChallenged { context }
            | Self::NegativeContextMissing { context }
            | Self::IncompleteRound { context }
            | Self::UntestedPremises { context }
            | Self::TooObvious { context, .. }
            | Self::InvalidIndex { context }
            | Self::ResourceNotFound { context, .. }
            | Self::DatabaseError { context, .. }
            | Self::LlmApiError { context, .. }
            | Self::ConcurrencyConflict { context }
            | Self::AgentLoopExceeded { context }
            | Self::ToolExecutionError { context, .. }
            | Self::UnknownTool { context, .. } => context,
        }
    }

    pub fn recoverable(&self) -> bool {
        matches!(self.severity(), Severity::Info | Severity::Warning)
    }

    /// `{error:{code,message,category,severity,timestamp,context}}`
    pub fn to_rest_envelope(&self) -> Value {
        serde_json::json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
                "category": self.category(),
                "severity": self.severity(),
                "timestamp": Utc::now(),
                "context": self.context(),
            }
        })
    }

    /// `{type:"error", data:{code,message,severity,recoverable,tool_name}}`
    pub fn to_stream_envelope(&self) -> Value {
        serde_json::json!({
            "type": "error",
            "data": {
                "code": self.code(),
                "message": self.to_string(),
                "severity": self.severity(),
                "recoverable": self.recoverable(),
                "tool_name": self.context().tool_name,
            }
        })
    }

    /// The tagged `{status, error_code, message, ...}` dict a tool handler
    /// returns instead of raising, per §4.5/§7. Business-rule variants carry
    /// their own extra fields; infrastructure variants (caught by the
    /// dispatcher rather than raised by a validator) degrade to a plain
    /// `"error"` status with their message.
    pub fn to_tool_result(&self) -> Value {
        let status = if matches!(self, Self::TooObvious { .. }) {
            "rejected"
        } else {
            "error"
        };
        let mut value = serde_json::json!({
            "status": status,
            "error_code": self.code(),
            "message": self.to_string(),
        });
        let extra = match self {
            Self::GatesNotSatisfied { missing_gates, .. } => {
                serde_json::json!({ "missing_gates": missing_gates })
            }
            Self::TooObvious {
                premise_index,
                score,
                ..
            } => serde_json::json!({ "premise_index": premise_index, "score": score }),
            _ => serde_json::json!({}),
        };
        if let (Value::Object(base), Value::Object(more)) = (&mut value, extra) {
            base.extend(more);
        }
        value
    }

    pub fn database(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DatabaseError {
            operation: operation.into(),
            message: message.into(),
            context: ErrorContext::new(),
        }
    }

    pub fn llm(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LlmApiError {
            kind: kind.into(),
            message: message.into(),
            context: ErrorContext::new(),
        }
    }
}

impl IntoResponse for GhostPathError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        let body = self.to_rest_envelope();
        (status, axum::Json(body)).into_response()
    }
}

impl From<sqlx::Error> for GhostPathError {
    fn from(err: sqlx::Error) -> Self {
        Self::database("query", err.to_string())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Timestamped<T> {
    pub value: T,
    pub at: DateTime<Utc>,
}
