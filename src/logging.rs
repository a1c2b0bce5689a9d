//! Structured logging setup.
//!
//! Mirrors the `tracing`/`tracing-subscriber` setup pattern used elsewhere in
//! the corpus for CLI and service tooling: a single [`setup`] entry point
//! that picks a format layer based on an explicit [`LogFormat`] or, for
//! [`LogFormat::Auto`], based on whether stderr is a terminal.

use std::io::IsTerminal;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LogFormat;

/// Initialize the global `tracing` subscriber.
///
/// `level` is the minimum level for GhostPath's own spans; `format` selects
/// the output encoding. Call this once, at process start, before binding the
/// HTTP listener.
pub fn setup(level: &str, format: LogFormat) -> Result<(), String> {
    let is_term = std::io::stderr().is_terminal();
    let resolved_format = match format {
        LogFormat::Auto => {
            if is_term {
                LogFormat::Pretty
            } else {
                LogFormat::Json
            }
        }
        other => other,
    };

    let filter = EnvFilter::try_new(format!("{level},tower_http=info,sqlx=warn"))
        .map_err(|e| format!("invalid LOG_LEVEL `{level}`: {e}"))?;

    let registry = tracing_subscriber::registry().with(filter);
    let format_layer = fmt::layer().with_ansi(is_term).with_writer(std::io::stderr);

    match resolved_format {
        LogFormat::Json => registry.with(format_layer.json()).init(),
        LogFormat::Compact => registry.with(format_layer.compact()).init(),
        LogFormat::Pretty => registry.with(format_layer.pretty()).init(),
        LogFormat::Auto => unreachable!("resolved above"),
    };

    tracing::info!(format = ?resolved_format, "logging initialized");
    Ok(())
}
