//! Diagnostic logging for likesweep
//!
//! Diagnostics go to stderr through `tracing`. The sweep's console narration
//! is printed to stdout by the binary and never passes through here, which is
//! why the default level is `warn`: progress is already visible.
//!
//! ```no_run
//! use liblikesweep::logging::{LogFormat, Logging};
//!
//! Logging::from_env()
//!     .with_format(Some(LogFormat::Json))
//!     .with_verbosity(1)
//!     .init();
//! ```

use std::fmt;
use std::str::FromStr;

use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

pub const ENV_LOG_FORMAT: &str = "LIKESWEEP_LOG_FORMAT";
pub const ENV_LOG_LEVEL: &str = "LIKESWEEP_LOG_LEVEL";

const QUIET_LEVEL: &str = "warn";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One line per event, no target
    #[default]
    Text,
    /// One JSON object per line
    Json,
    /// Multi-line with source locations
    Pretty,
}

impl LogFormat {
    pub const ALL: [LogFormat; 3] = [LogFormat::Text, LogFormat::Json, LogFormat::Pretty];

    pub fn as_str(self) -> &'static str {
        match self {
            LogFormat::Text => "text",
            LogFormat::Json => "json",
            LogFormat::Pretty => "pretty",
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|format| format.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown log format '{}' (expected text, json or pretty)", s))
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the stderr subscriber is built
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Logging {
    pub format: LogFormat,
    /// Directive taken from `LIKESWEEP_LOG_LEVEL`
    pub level: Option<String>,
    /// Number of `-v` flags given on the command line
    pub verbosity: u8,
}

type FilteredRegistry = Layered<EnvFilter, Registry>;

impl Logging {
    /// Read `LIKESWEEP_LOG_FORMAT` and `LIKESWEEP_LOG_LEVEL`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let format = lookup(ENV_LOG_FORMAT)
            .and_then(|value| value.parse().ok())
            .unwrap_or_default();
        let level = lookup(ENV_LOG_LEVEL)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        Self {
            format,
            level,
            verbosity: 0,
        }
    }

    /// Replace the format when the command line names one
    pub fn with_format(mut self, format: Option<LogFormat>) -> Self {
        if let Some(format) = format {
            self.format = format;
        }
        self
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Filter directive used when `RUST_LOG` is unset. `-v` flags take
    /// precedence over `LIKESWEEP_LOG_LEVEL`.
    pub fn directive(&self) -> &str {
        match self.verbosity {
            0 => self.level.as_deref().unwrap_or(QUIET_LEVEL),
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    /// Install the global subscriber. Later calls keep the first one.
    pub fn init(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.directive()));

        let layer: Box<dyn Layer<FilteredRegistry> + Send + Sync> = match self.format {
            LogFormat::Text => tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .boxed(),
            LogFormat::Json => tracing_subscriber::fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_writer(std::io::stderr)
                .boxed(),
            LogFormat::Pretty => tracing_subscriber::fmt::layer()
                .pretty()
                .with_file(true)
                .with_line_number(true)
                .with_writer(std::io::stderr)
                .boxed(),
        };

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(layer)
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        move |key| map.get(key).map(|v| v.to_string())
    }

    #[test]
    fn test_parse_log_format() {
        assert_eq!("text".parse::<LogFormat>(), Ok(LogFormat::Text));
        assert_eq!(" JSON ".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("Pretty".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert!("yaml"
            .parse::<LogFormat>()
            .unwrap_err()
            .contains("unknown log format 'yaml'"));
    }

    #[test]
    fn test_defaults_are_quiet_text() {
        let logging = Logging::from_lookup(lookup(&[]));
        assert_eq!(logging.format, LogFormat::Text);
        assert_eq!(logging.directive(), "warn");
    }

    #[test]
    fn test_env_values_are_read() {
        let logging = Logging::from_lookup(lookup(&[
            (ENV_LOG_FORMAT, "json"),
            (ENV_LOG_LEVEL, "liblikesweep=debug"),
        ]));
        assert_eq!(logging.format, LogFormat::Json);
        assert_eq!(logging.directive(), "liblikesweep=debug");
    }

    #[test]
    fn test_unknown_env_format_falls_back_to_text() {
        let logging = Logging::from_lookup(lookup(&[(ENV_LOG_FORMAT, "xml"), (ENV_LOG_LEVEL, " ")]));
        assert_eq!(logging.format, LogFormat::Text);
        assert_eq!(logging.level, None);
    }

    #[test]
    fn test_cli_format_overrides_env() {
        let logging = Logging::from_lookup(lookup(&[(ENV_LOG_FORMAT, "json")]))
            .with_format(Some(LogFormat::Pretty));
        assert_eq!(logging.format, LogFormat::Pretty);

        let logging = Logging::from_lookup(lookup(&[(ENV_LOG_FORMAT, "json")])).with_format(None);
        assert_eq!(logging.format, LogFormat::Json);
    }

    #[test]
    fn test_verbosity_raises_level() {
        let base = Logging::from_lookup(lookup(&[(ENV_LOG_LEVEL, "error")]));
        assert_eq!(base.directive(), "error");
        assert_eq!(base.clone().with_verbosity(1).directive(), "info");
        assert_eq!(base.clone().with_verbosity(2).directive(), "debug");
        assert_eq!(base.with_verbosity(5).directive(), "trace");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        let logging = Logging::default();
        logging.init();
        logging.init();
    }
}
