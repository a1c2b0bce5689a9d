//! LLM Client Wrapper: a provider-agnostic abstraction over the vendor
//! message API, with retry, timeout, and fault classification baked in.

pub mod client;
pub mod retry;

pub use client::{
    ClientWrapper, ContentBlock, LlmMessage, LlmRequest, LlmResponse, LlmRole, StopReason,
    ToolDefinition, ToolUse,
};
pub use retry::{retry_with_backoff, LlmFault, RetryConfig};
