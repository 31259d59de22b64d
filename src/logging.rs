//! Structured logging setup using the `tracing` ecosystem.
//!
//! JSON output for production, pretty output for a TTY; either can be
//! forced with `--json` or `--pretty`. The broker client crates are capped
//! at `warn` so their frame-level chatter does not drown the bridge's own
//! connection lifecycle events.

use tracing::Level;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::LogLevel;

const NOISY_TARGETS: &[&str] = &["lapin", "amq_protocol", "pinky_swear"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[must_use]
pub fn resolve_format(pretty: bool, json: bool) -> LogFormat {
    if json {
        LogFormat::Json
    } else if pretty || std::io::IsTerminal::is_terminal(&std::io::stdout()) {
        LogFormat::Pretty
    } else {
        LogFormat::Json
    }
}

#[must_use]
pub fn filter(level: &LogLevel) -> Targets {
    let level = level.to_tracing_level();
    NOISY_TARGETS.iter().fold(
        Targets::new().with_default(level),
        |targets, target| targets.with_target(*target, level.min(Level::WARN)),
    )
}

pub fn init(level: &LogLevel, format: LogFormat) {
    let registry = tracing_subscriber::registry().with(filter(level));

    #[cfg(feature = "sentry-integration")]
    let registry = registry.with(sentry_tracing::layer());

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(false))
            .init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).init(),
    }
}
