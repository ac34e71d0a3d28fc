//! Installs the `tracing` subscriber used by the `roofline` binary.
//!
//! Output goes to stderr so that stdout carries only the JSON or text result.

use std::env;

use anyhow::{anyhow, Result};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

pub const LOG_FORMAT_VAR: &str = "ROOFLINE_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    pub fn from_env_value(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" | "text" => Some(LogFormat::Compact),
            "json" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Filter directives; `RUST_LOG` wins when set.
    pub default_directive: String,
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn from_env(verbose: u8) -> Self {
        let default_directive = match verbose {
            0 => "warn",
            1 => "roofline_rs=debug,info",
            _ => "roofline_rs=trace,debug",
        }
        .to_string();
        let format = env::var(LOG_FORMAT_VAR)
            .ok()
            .and_then(|value| LogFormat::from_env_value(&value))
            .unwrap_or(LogFormat::Compact);
        LoggingConfig {
            default_directive,
            format,
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.default_directive))
    }
}

pub fn init(config: &LoggingConfig) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(config.filter())
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::NONE)
        .with_target(true);

    let installed = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_log_format_values() {
        assert_eq!(LogFormat::from_env_value("JSON"), Some(LogFormat::Json));
        assert_eq!(LogFormat::from_env_value(" text "), Some(LogFormat::Compact));
        assert_eq!(LogFormat::from_env_value("pretty"), None);
    }
}
