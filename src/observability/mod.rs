//! Logging setup and redaction helpers.
//!
//! The client emits `tracing` spans and events: one span per dispatched
//! request and `debug!` events as it moves through URL building, body
//! encoding and the transport call. URLs and headers pass through the
//! helpers below before they are logged.

use regex::Regex;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Headers, REDACTED};
use crate::errors::{HttpClientError, HttpResult};

/// Header names whose values are never logged.
const SENSITIVE_HEADERS: [&str; 5] = [
    "authorization",
    "proxy-authorization",
    "cookie",
    "set-cookie",
    "x-api-key",
];

const URL_PASSWORD_PATTERN: &str = r"^([a-zA-Z][a-zA-Z\d+\-.]*://[^/:@?#]+):[^/@?#]*@";

const SENSITIVE_PARAM_PATTERN: &str =
    r"(?i)([?&](?:access_token|api_key|apikey|key|password|secret|token)=)[^&#]*";

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Level used when `RUST_LOG` is not set.
    pub level: LogLevel,
    /// Output format.
    pub format: LogFormat,
    /// Include the module target in each line.
    pub include_target: bool,
}

impl LogConfig {
    /// Creates a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the level.
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Sets the format.
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets whether targets are printed.
    pub fn with_target(mut self, include: bool) -> Self {
        self.include_target = include;
        self
    }
}

/// Installs a global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Fails if a global
/// subscriber is already installed.
///
/// ```no_run
/// use integrations_http_client::observability::{init_tracing, LogConfig, LogFormat};
///
/// init_tracing(&LogConfig::new().with_format(LogFormat::Json)).unwrap();
/// ```
pub fn init_tracing(config: &LogConfig) -> HttpResult<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from(config.level).into())
        .from_env_lossy();

    let result = match config.format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(config.include_target))
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(config.include_target))
            .try_init(),
    };

    result.map_err(|e| HttpClientError::configuration(format!("failed to install tracing subscriber: {e}")))
}

/// Masks the password in a URL's userinfo and the values of credential-like
/// query parameters.
pub fn redact_url(url: &str) -> String {
    let mut redacted = url.to_string();
    if let Ok(re) = Regex::new(URL_PASSWORD_PATTERN) {
        redacted = re.replace(&redacted, format!("$1:{REDACTED}@")).into_owned();
    }
    if let Ok(re) = Regex::new(SENSITIVE_PARAM_PATTERN) {
        redacted = re.replace_all(&redacted, format!("${{1}}{REDACTED}")).into_owned();
    }
    redacted
}

/// Returns a copy of `headers` with credential values masked.
pub fn redact_headers(headers: &Headers) -> Headers {
    headers
        .iter()
        .map(|(name, value)| {
            let value = if SENSITIVE_HEADERS
                .iter()
                .any(|sensitive| sensitive.eq_ignore_ascii_case(name))
            {
                REDACTED.to_string()
            } else {
                value.clone()
            };
            (name.clone(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("https://u:p@h/x", "https://u:[REDACTED]@h/x" ; "userinfo")]
    #[test_case("https://h/x?token=abc&page=2", "https://h/x?token=[REDACTED]&page=2" ; "token param")]
    #[test_case("https://h/x?page=2&API_KEY=k#f", "https://h/x?page=2&API_KEY=[REDACTED]#f" ; "key param")]
    #[test_case("/plain?q=1", "/plain?q=1" ; "untouched")]
    fn test_redact_url(input: &str, expected: &str) {
        assert_eq!(redact_url(input), expected);
    }

    #[test]
    fn test_redact_headers() {
        let mut headers = Headers::new();
        headers.insert("Authorization".to_string(), "Basic abc".to_string());
        headers.insert("Accept".to_string(), "*/*".to_string());

        let redacted = redact_headers(&headers);
        assert_eq!(redacted["Authorization"], REDACTED);
        assert_eq!(redacted["Accept"], "*/*");
    }

    #[test]
    fn test_log_config_builder() {
        let config = LogConfig::new()
            .with_level(LogLevel::Debug)
            .with_format(LogFormat::Json)
            .with_target(true);
        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.include_target);
        assert_eq!(LevelFilter::from(LogLevel::Warn), LevelFilter::WARN);
    }
}
