//! Logging setup shared by the `mrcp` binary and embedding applications.
//!
//! ```ignore
//! use mrcp_core::tracing::{init_tracing, TracingConfig};
//!
//! init_tracing(TracingConfig::server().with_wire_trace(true))?;
//! ```
//!
//! `RUST_LOG` wins over the configured level when it is set.

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    prelude::*,
};

/// Crate targets that receive the default level.
const TARGETS: [&str; 4] = ["mrcp_core", "mrcp_protocol", "mrcp_server", "mrcp_client"];

/// Target that logs every encoded and decoded frame at TRACE.
pub const WIRE_TARGET: &str = "mrcp_protocol::wire";

#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("failed to parse env filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    #[default]
    Pretty,
    Compact,
    /// One JSON object per line, for long-running servers.
    Json,
}

#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level applied to the mrcp crates when `RUST_LOG` is unset.
    pub default_level: Level,
    pub output_format: TracingOutputFormat,
    pub include_location: bool,
    pub include_timestamp: bool,
    /// Emit span open/close events (connection and request spans).
    pub include_span_events: bool,
    /// Log raw frames under [`WIRE_TARGET`].
    pub wire_trace: bool,
    /// Explicit directive; bypasses both `RUST_LOG` and `default_level`.
    pub env_filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: Level::INFO,
            output_format: TracingOutputFormat::Pretty,
            include_location: false,
            include_timestamp: true,
            include_span_events: false,
            wire_trace: false,
            env_filter: None,
        }
    }
}

impl TracingConfig {
    /// Short single-line output for interactive `mrcp send`.
    #[must_use]
    pub fn client() -> Self {
        Self {
            default_level: Level::WARN,
            output_format: TracingOutputFormat::Compact,
            include_timestamp: false,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn server() -> Self {
        Self {
            default_level: Level::INFO,
            output_format: TracingOutputFormat::Json,
            include_location: true,
            include_span_events: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.default_level = level;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.output_format = format;
        self
    }

    #[must_use]
    pub fn with_wire_trace(mut self, enabled: bool) -> Self {
        self.wire_trace = enabled;
        self
    }

    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// The directive used when neither `env_filter` nor `RUST_LOG` is set.
    pub fn default_directives(&self) -> String {
        let mut directives: Vec<String> = TARGETS
            .iter()
            .map(|target| format!("{target}={}", self.default_level))
            .collect();
        if self.wire_trace {
            directives.push(format!("{WIRE_TARGET}=trace"));
        }
        directives.join(",")
    }

    fn build_filter(&self) -> Result<EnvFilter, TracingError> {
        if let Some(filter) = &self.env_filter {
            return Ok(EnvFilter::try_new(filter)?);
        }
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => Ok(EnvFilter::try_new(self.default_directives())?),
        }
    }
}

/// Installs the global subscriber. Call once per process.
///
/// # Errors
///
/// Fails if a global subscriber is already installed or if the explicit
/// filter directive does not parse.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let env_filter = config.build_filter()?;

    let span_events = if config.include_span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let layer = fmt::layer()
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_span_events(span_events);

    let layer = match (config.output_format, config.include_timestamp) {
        (TracingOutputFormat::Pretty, true) => layer.pretty().boxed(),
        (TracingOutputFormat::Pretty, false) => layer.pretty().without_time().boxed(),
        (TracingOutputFormat::Compact, true) => layer.compact().boxed(),
        (TracingOutputFormat::Compact, false) => layer.compact().without_time().boxed(),
        (TracingOutputFormat::Json, true) => layer.json().boxed(),
        (TracingOutputFormat::Json, false) => layer.json().without_time().boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(env_filter).with(layer);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets() {
        let client = TracingConfig::client();
        assert_eq!(client.default_level, Level::WARN);
        assert_eq!(client.output_format, TracingOutputFormat::Compact);
        assert!(!client.include_timestamp);

        let server = TracingConfig::server();
        assert_eq!(server.output_format, TracingOutputFormat::Json);
        assert!(server.include_span_events);
        assert!(!server.wire_trace);
    }

    #[test]
    fn default_directives_cover_every_crate() {
        let directives = TracingConfig::default()
            .with_level(Level::DEBUG)
            .default_directives();
        assert_eq!(
            directives,
            "mrcp_core=DEBUG,mrcp_protocol=DEBUG,mrcp_server=DEBUG,mrcp_client=DEBUG"
        );
        assert!(EnvFilter::try_new(&directives).is_ok());
    }

    #[test]
    fn wire_trace_adds_directive() {
        let directives = TracingConfig::default()
            .with_wire_trace(true)
            .default_directives();
        assert!(directives.ends_with(",mrcp_protocol::wire=trace"));
    }

    #[test]
    fn explicit_filter_is_validated() {
        let config = TracingConfig::default().with_env_filter("mrcp_server=[");
        assert!(config.build_filter().is_err());

        let config = TracingConfig::default().with_env_filter("mrcp_server=trace");
        assert!(config.build_filter().is_ok());
    }
}
