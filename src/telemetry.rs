//! Tracing subscriber setup for the command-line tool.

use std::io::{self, IsTerminal};
use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

/// Environment variable consulted when no filter is passed.
pub const LOG_ENV: &str = "HOLEPUNCH_LOG";

const DEFAULT_FILTER: &str = "warn";

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("invalid log filter: {0}")]
    Filter(String),
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(String),
}

/// Install the global subscriber writing to stderr.
///
/// `filter` wins over `HOLEPUNCH_LOG`, which wins over `warn`.
pub fn init(filter: Option<&str>) -> Result<(), TelemetryError> {
    let directives = resolve_filter(filter, std::env::var(LOG_ENV).ok());
    let filter =
        EnvFilter::try_new(&directives).map_err(|error| TelemetryError::Filter(error.to_string()))?;

    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .compact()
        .try_init()
        .map_err(|error| TelemetryError::Subscriber(error.to_string()))
}

fn resolve_filter(flag: Option<&str>, env: Option<String>) -> String {
    flag.map(str::to_string)
        .or(env.filter(|value| !value.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}
