//! Structured logging infrastructure for skydrop.
//!
//! Centralized subscriber setup with human-readable or JSON output and
//! `RUST_LOG`-based filtering.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format of the process-wide subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines
    Pretty,
    /// One JSON object per line, for log aggregation
    Json,
}

impl LogFormat {
    /// Parse a `LOG_FORMAT` value; anything but `json` selects pretty output
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize the logging system with human-readable output.
///
/// Log level can be configured via the `RUST_LOG` environment variable.
/// If not set, defaults to `info` level.
///
/// # Example
/// ```no_run
/// use skydrop_core::logging;
///
/// logging::init();
/// tracing::info!("mission control started");
/// ```
pub fn init() {
    tracing_subscriber::registry()
        .with(default_filter())
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .init();
}

/// Initialize the logging system with JSON output for production environments.
pub fn init_json() {
    tracing_subscriber::registry()
        .with(default_filter())
        .with(fmt::layer().json().with_target(true).with_thread_ids(true))
        .init();
}

/// Initialize logging in the requested format
pub fn init_with(format: LogFormat) {
    match format {
        LogFormat::Pretty => init(),
        LogFormat::Json => init_json(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_from_env_value() {
        assert_eq!(LogFormat::from_env_value(Some("json")), LogFormat::Json);
        assert_eq!(LogFormat::from_env_value(Some("JSON")), LogFormat::Json);
        assert_eq!(LogFormat::from_env_value(Some("text")), LogFormat::Pretty);
        assert_eq!(LogFormat::from_env_value(None), LogFormat::Pretty);
    }
}
