//! Relay configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).

use std::net::SocketAddr;
use std::time::Duration;

use crate::backplane::memory::DEFAULT_SUBSCRIBER_BUFFER;

/// Log output format selected by `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Top-level relay configuration.
///
/// Loaded once at startup via [`RelayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:3000`).
    pub listen_addr: SocketAddr,

    /// Per-subscriber queue capacity of the in-memory backplane.
    pub subscriber_buffer: usize,

    /// Upper bound on a single stream's lifetime; `None` means unlimited.
    pub stream_max_duration: Option<Duration>,

    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            subscriber_buffer: DEFAULT_SUBSCRIBER_BUFFER,
            stream_max_duration: None,
            log_format: LogFormat::Text,
        }
    }
}

impl RelayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to defaults when a variable is not set. Calls
    /// `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// | Variable                   | Default        |
    /// |----------------------------|----------------|
    /// | `LISTEN_ADDR`              | `0.0.0.0:3000` |
    /// | `SUBSCRIBER_BUFFER`        | `256`          |
    /// | `STREAM_MAX_DURATION_SECS` | `0` (no limit) |
    /// | `LOG_FORMAT`               | `text`         |
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`].
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()?;

        let subscriber_buffer = parse_env("SUBSCRIBER_BUFFER", DEFAULT_SUBSCRIBER_BUFFER);

        let stream_max_duration = match parse_env("STREAM_MAX_DURATION_SECS", 0_u64) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        let log_format = parse_log_format(std::env::var("LOG_FORMAT").ok().as_deref());

        Ok(Self {
            listen_addr,
            subscriber_buffer,
            stream_max_duration,
            log_format,
        })
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// `"json"` (any case) selects JSON; anything else is text.
fn parse_log_format(value: Option<&str>) -> LogFormat {
    match value {
        Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
        _ => LogFormat::Text,
    }
}
