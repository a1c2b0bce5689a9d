//! Typed configuration for GhostPath, loaded once from the environment.
//!
//! Unlike the upstream CloudLLM config (a single `PathBuf` with a `Default`
//! impl), the session runtime reads a fixed set of environment variables
//! directly — no TOML/YAML parsing dependency is introduced, consistent with
//! static configuration loading being out of scope for the core.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// Logging output format. `Auto` selects `Json` off a TTY and `Pretty` on one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Auto,
    Pretty,
    Compact,
    Json,
}

impl LogFormat {
    fn parse(raw: &str) -> Result<Self, String> {
        match raw.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!("unrecognized LOG_FORMAT `{other}`")),
        }
    }
}

/// Settings consumed by every layer of the runtime: the store pool, the LLM
/// client's retry policy, the agent loop's iteration cap, and the HTTP
/// surface's bind address and CORS policy.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub llm_api_key: String,
    pub llm_model: String,

    pub db_pool_max_connections: u32,
    pub db_pool_min_connections: u32,
    pub db_pool_acquire_timeout: Duration,

    pub llm_max_retries: u32,
    pub llm_base_delay: Duration,
    pub llm_max_delay: Duration,
    pub llm_request_timeout: Duration,

    pub agent_max_iterations: usize,

    pub cors_allowed_origins: Vec<String>,

    pub log_level: String,
    pub log_format: LogFormat,

    pub spec_artifact_dir: String,
    pub http_bind_addr: SocketAddr,
}

fn env_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, String> {
    match env_var(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| format!("{key} is set but could not be parsed: `{raw}`")),
    }
}

impl Settings {
    /// Load settings from the process environment, failing fast with a
    /// descriptive message if a required variable is missing or a value
    /// cannot be parsed.
    pub fn from_env() -> Result<Self, String> {
        let database_url =
            env_var("DATABASE_URL").ok_or_else(|| "DATABASE_URL must be set".to_string())?;
        let llm_api_key = env_var("LLM_API_KEY")
            .ok_or_else(|| "LLM_API_KEY must be set".to_string())?;
        let llm_model = env_var("LLM_MODEL").unwrap_or_else(|| "claude-opus-4-1".to_string());

        let db_pool_max_connections = env_or("DB_POOL_MAX_CONNECTIONS", 10u32)?;
        let db_pool_min_connections = env_or("DB_POOL_MIN_CONNECTIONS", 1u32)?;
        let db_pool_acquire_timeout_secs = env_or("DB_POOL_ACQUIRE_TIMEOUT_SECS", 10u64)?;

        let llm_max_retries = env_or("LLM_MAX_RETRIES", 3u32)?;
        let llm_base_delay_ms = env_or("LLM_BASE_DELAY_MS", 1_000u64)?;
        let llm_max_delay_ms = env_or("LLM_MAX_DELAY_MS", 60_000u64)?;
        let llm_request_timeout_secs = env_or("LLM_REQUEST_TIMEOUT_SECS", 60u64)?;

        let agent_max_iterations = env_or("AGENT_MAX_ITERATIONS", 50usize)?;

        let cors_allowed_origins = env_var("CORS_ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let log_level = env_var("LOG_LEVEL").unwrap_or_else(|| "info".to_string());
        let log_format = match env_var("LOG_FORMAT") {
            None => LogFormat::Auto,
            Some(raw) => LogFormat::parse(&raw)?,
        };

        let spec_artifact_dir =
            env_var("SPEC_ARTIFACT_DIR").unwrap_or_else(|| "./spec_artifacts".to_string());

        let http_bind_addr: SocketAddr = env_var("HTTP_BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse()
            .map_err(|e| format!("HTTP_BIND_ADDR is invalid: {e}"))?;

        Ok(Self {
            database_url,
            llm_api_key,
            llm_model,
            db_pool_max_connections,
            db_pool_min_connections,
            db_pool_acquire_timeout: Duration::from_secs(db_pool_acquire_timeout_secs),
            llm_max_retries,
            llm_base_delay: Duration::from_millis(llm_base_delay_ms),
            llm_max_delay: Duration::from_millis(llm_max_delay_ms),
            llm_request_timeout: Duration::from_secs(llm_request_timeout_secs),
            agent_max_iterations,
            cors_allowed_origins,
            log_level,
            log_format,
            spec_artifact_dir,
            http_bind_addr,
        })
    }
}
