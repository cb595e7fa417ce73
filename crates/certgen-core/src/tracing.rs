//! Logging setup shared by the certgen binaries.
//!
//! Log lines go to stderr, either as human-readable text or as JSON objects
//! for collectors. `RUST_LOG` always wins over the configured level.
//!
//! ```ignore
//! use certgen_core::tracing::{init_tracing, TracingConfig};
//!
//! init_tracing(TracingConfig::from_flags(false, true))?;
//! ```

use std::io;

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

/// Errors that can occur during tracing initialization
#[derive(Debug, Error)]
pub enum TracingError {
    /// A global subscriber is already installed
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    /// The filter directive does not parse
    #[error("failed to parse env filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// How log lines are written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    /// Single-line text
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level for the certgen crates when `RUST_LOG` is unset
    pub default_level: Level,
    /// Output format
    pub output_format: TracingOutputFormat,
    /// Include source file and line
    pub include_location: bool,
    /// Include timestamps
    pub include_timestamp: bool,
    /// Filter directive replacing the default one
    pub env_filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: Level::INFO,
            output_format: TracingOutputFormat::Text,
            include_location: false,
            include_timestamp: true,
            env_filter: None,
        }
    }
}

impl TracingConfig {
    /// Verbose text output for troubleshooting at a terminal
    #[must_use]
    pub fn cli_debug() -> Self {
        Self {
            default_level: Level::DEBUG,
            include_location: true,
            include_timestamp: false,
            ..Self::default()
        }
    }

    /// JSON output for a server whose logs are collected elsewhere
    #[must_use]
    pub fn server() -> Self {
        Self {
            output_format: TracingOutputFormat::Json,
            include_location: true,
            ..Self::default()
        }
    }

    /// Picks a preset from the `--debug` and `--json-logs` flags.
    /// `--debug` takes precedence.
    #[must_use]
    pub fn from_flags(debug: bool, json: bool) -> Self {
        match (debug, json) {
            (true, _) => Self::cli_debug(),
            (false, true) => Self::server(),
            (false, false) => Self::default(),
        }
    }

    /// Set the default log level
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.default_level = level;
        self
    }

    /// Set a custom env filter directive
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    fn filter(&self) -> Result<EnvFilter, TracingError> {
        if let Some(filter) = &self.env_filter {
            return Ok(EnvFilter::try_new(filter)?);
        }
        Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive(self.default_level))))
    }

    fn layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let layer = fmt::layer()
            .with_writer(io::stderr)
            .with_file(self.include_location)
            .with_line_number(self.include_location);

        match (self.output_format, self.include_timestamp) {
            (TracingOutputFormat::Json, _) => layer.json().boxed(),
            (TracingOutputFormat::Text, true) => layer.compact().boxed(),
            (TracingOutputFormat::Text, false) => layer.compact().without_time().boxed(),
        }
    }
}

/// Crate targets enabled by the default filter.
const CRATE_TARGETS: &[&str] = &["certgen_core", "certgen_providers", "certgen_server", "certgen"];

/// Builds the filter directive used when `RUST_LOG` is unset.
fn default_directive(level: Level) -> String {
    CRATE_TARGETS
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect::<Vec<_>>()
        .join(",")
}

/// Installs the global subscriber. Call once, before anything logs.
///
/// # Errors
///
/// Returns an error if a subscriber is already installed or if the filter
/// directive is invalid.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let subscriber = tracing_subscriber::registry()
        .with(config.layer())
        .with(config.filter()?);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_follow_flags() {
        let config = TracingConfig::from_flags(false, false);
        assert_eq!(config.default_level, Level::INFO);
        assert_eq!(config.output_format, TracingOutputFormat::Text);

        let config = TracingConfig::from_flags(true, false);
        assert_eq!(config.default_level, Level::DEBUG);
        assert!(config.include_location);
        assert!(!config.include_timestamp);

        let config = TracingConfig::from_flags(false, true);
        assert_eq!(config.output_format, TracingOutputFormat::Json);
        assert_eq!(config.default_level, Level::INFO);

        assert_eq!(
            TracingConfig::from_flags(true, true).output_format,
            TracingOutputFormat::Text
        );
    }

    #[test]
    fn default_directive_covers_all_crates() {
        let directive = default_directive(Level::DEBUG);
        assert_eq!(
            directive,
            "certgen_core=DEBUG,certgen_providers=DEBUG,certgen_server=DEBUG,certgen=DEBUG"
        );
        assert!(EnvFilter::try_new(&directive).is_ok());
    }

    #[test]
    fn custom_filter_is_used_verbatim() {
        let config = TracingConfig::default()
            .with_level(Level::WARN)
            .with_env_filter("certgen_server=trace");
        assert_eq!(config.default_level, Level::WARN);
        assert!(config.filter().is_ok());

        let config = TracingConfig::default().with_env_filter("certgen=[");
        assert!(matches!(config.filter(), Err(TracingError::EnvFilter(_))));
    }
}
