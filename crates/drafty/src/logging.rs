//! Logging bootstrap.
//!
//! The container crates only emit `tracing` events; nothing is printed until
//! a subscriber is installed. [`init`] installs a `tracing-subscriber`
//! registry with an [`EnvFilter`] and one formatting layer.
//!
//! Environment overrides, read by [`LogConfig::from_env`]:
//!
//! - `DRAFTY_LOG`: filter directives, e.g. `drafty_core=trace`. Falls back to
//!   `RUST_LOG`.
//! - `DRAFTY_LOG_FORMAT`: `pretty`, `compact` or `json`.
//!
//! Installing twice is an error, not a panic, so libraries and tests may call
//! [`init`] defensively.

use std::fmt;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt as tfmt};

pub const FILTER_ENV: &str = "DRAFTY_LOG";
pub const FORMAT_ENV: &str = "DRAFTY_LOG_FORMAT";
const FALLBACK_FILTER_ENV: &str = "RUST_LOG";
const DEFAULT_FILTER: &str = "warn";

/// Output format of the installed subscriber.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, human oriented.
    Pretty,
    #[default]
    Compact,
    /// One JSON object per event. Requires the `json-logs` feature.
    Json,
}

impl LogFormat {
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "pretty" => Some(Self::Pretty),
            "compact" => Some(Self::Compact),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pretty => "pretty",
            Self::Compact => "compact",
            Self::Json => "json",
        }
    }
}

/// Subscriber settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogConfig {
    /// `EnvFilter` directives.
    pub filter: String,
    pub format: LogFormat,
    /// Colorize output. Ignored for JSON.
    pub ansi: bool,
    /// Include the event target (module path).
    pub with_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            format: LogFormat::default(),
            ansi: true,
            with_target: true,
        }
    }
}

impl LogConfig {
    /// Defaults overridden by `DRAFTY_LOG`, `RUST_LOG` and
    /// `DRAFTY_LOG_FORMAT`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let filter = lookup(FILTER_ENV)
            .or_else(|| lookup(FALLBACK_FILTER_ENV))
            .filter(|f| !f.trim().is_empty());
        if let Some(filter) = filter {
            config.filter = filter;
        }
        if let Some(format) = lookup(FORMAT_ENV).as_deref().and_then(LogFormat::from_name) {
            config.format = format;
        }
        config
    }

    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    #[must_use]
    pub fn with_target(mut self, with_target: bool) -> Self {
        self.with_target = with_target;
        self
    }
}

/// Reasons [`init`] can fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogInitError {
    /// The filter directives do not parse.
    InvalidFilter { filter: String, message: String },
    /// The format needs a cargo feature this build lacks.
    FormatUnavailable { format: LogFormat, feature: &'static str },
    /// A global subscriber is already installed.
    AlreadyInitialized(String),
}

impl fmt::Display for LogInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFilter { filter, message } => {
                write!(f, "invalid log filter '{filter}': {message}")
            }
            Self::FormatUnavailable { format, feature } => write!(
                f,
                "log format '{}' requires the '{feature}' feature",
                format.as_str()
            ),
            Self::AlreadyInitialized(message) => {
                write!(f, "logging already initialized: {message}")
            }
        }
    }
}

impl std::error::Error for LogInitError {}

/// Install the global subscriber described by `config`.
pub fn init(config: &LogConfig) -> Result<(), LogInitError> {
    let filter = EnvFilter::try_new(&config.filter).map_err(|err| LogInitError::InvalidFilter {
        filter: config.filter.clone(),
        message: err.to_string(),
    })?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.format {
        LogFormat::Pretty => registry
            .with(
                tfmt::layer()
                    .pretty()
                    .with_ansi(config.ansi)
                    .with_target(config.with_target),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(
                tfmt::layer()
                    .compact()
                    .with_ansi(config.ansi)
                    .with_target(config.with_target),
            )
            .try_init(),
        #[cfg(feature = "json-logs")]
        LogFormat::Json => registry
            .with(tfmt::layer().json().with_target(config.with_target))
            .try_init(),
        #[cfg(not(feature = "json-logs"))]
        LogFormat::Json => {
            return Err(LogInitError::FormatUnavailable {
                format: LogFormat::Json,
                feature: "json-logs",
            });
        }
    };

    installed.map_err(|err| LogInitError::AlreadyInitialized(err.to_string()))?;
    tracing::debug!(
        filter = %config.filter,
        format = config.format.as_str(),
        "logging initialized"
    );
    Ok(())
}

/// [`init`] with [`LogConfig::from_env`].
pub fn init_from_env() -> Result<(), LogInitError> {
    init(&LogConfig::from_env())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let config = LogConfig::from_lookup(lookup(&[]));
        assert_eq!(config, LogConfig::default());
        assert_eq!(config.filter, "warn");
        assert_eq!(config.format, LogFormat::Compact);
    }

    #[test]
    fn drafty_log_wins_over_rust_log() {
        let config = LogConfig::from_lookup(lookup(&[
            ("DRAFTY_LOG", "drafty_core=trace"),
            ("RUST_LOG", "info"),
        ]));
        assert_eq!(config.filter, "drafty_core=trace");
    }

    #[test]
    fn rust_log_fallback() {
        let config = LogConfig::from_lookup(lookup(&[("RUST_LOG", "debug")]));
        assert_eq!(config.filter, "debug");
    }

    #[test]
    fn blank_filter_ignored() {
        let config = LogConfig::from_lookup(lookup(&[("DRAFTY_LOG", "  ")]));
        assert_eq!(config.filter, "warn");
    }

    #[test]
    fn format_from_env() {
        let config = LogConfig::from_lookup(lookup(&[("DRAFTY_LOG_FORMAT", "Pretty")]));
        assert_eq!(config.format, LogFormat::Pretty);

        let config = LogConfig::from_lookup(lookup(&[("DRAFTY_LOG_FORMAT", "xml")]));
        assert_eq!(config.format, LogFormat::Compact);
    }

    #[test]
    fn builders() {
        let config = LogConfig::default()
            .with_filter("trace")
            .with_format(LogFormat::Json)
            .with_ansi(false)
            .with_target(false);
        assert_eq!(config.filter, "trace");
        assert_eq!(config.format, LogFormat::Json);
        assert!(!config.ansi);
        assert!(!config.with_target);
    }

    #[test]
    fn second_init_reports_error() {
        let config = LogConfig::default().with_ansi(false);
        let _ = init(&config);
        let err = init(&config).unwrap_err();
        assert!(matches!(err, LogInitError::AlreadyInitialized(_)));
    }

    #[test]
    fn error_display() {
        let err = LogInitError::FormatUnavailable {
            format: LogFormat::Json,
            feature: "json-logs",
        };
        assert_eq!(
            err.to_string(),
            "log format 'json' requires the 'json-logs' feature"
        );
    }
}
